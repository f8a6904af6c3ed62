// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolution order, sharing rules, and merged catalogs.

use cloudway_broker::Resolver;
use cloudway_core::{Category, CloudwayError};
use cloudway_test_utils::HubFixture;

async fn fixture() -> (HubFixture, Resolver) {
    let mut fx = HubFixture::new().unwrap();
    fx.framework("", "php", "5.6").await.unwrap();
    fx.framework("", "php", "7.0").await.unwrap();
    fx.framework("", "ruby", "2.3").await.unwrap();
    fx.service("", "mysql", "5.5").await.unwrap();

    // acme overrides php and has a private and a shared plugin of its own.
    fx.framework("acme", "php", "7.1").await.unwrap();
    fx.install("acme", "secret", "1.0", Category::Service, false)
        .await
        .unwrap();
    fx.install("acme", "commons", "1.0", Category::Service, true)
        .await
        .unwrap();

    let resolver = Resolver::new(fx.hub());
    (fx, resolver)
}

#[tokio::test]
async fn caller_namespace_wins_then_system_fallback() {
    let (_fx, resolver) = fixture().await;

    let php = resolver.resolve_str("acme", "php").unwrap();
    assert_eq!(php.namespace, "acme");
    assert_eq!(php.version, "7.1");

    let ruby = resolver.resolve_str("acme", "ruby").unwrap();
    assert!(ruby.is_system());

    // Explicit version missing in the caller namespace falls back to system.
    let old = resolver.resolve_str("acme", "php:5.6").unwrap();
    assert!(old.is_system());
    assert_eq!(old.version, "5.6");
}

#[tokio::test]
async fn caller_without_namespace_sees_system_only() {
    let (_fx, resolver) = fixture().await;
    assert_eq!(resolver.resolve_str("", "php").unwrap().version, "7.0");
    assert!(matches!(
        resolver.resolve_str("", "secret"),
        Err(CloudwayError::PluginNotFound { .. })
    ));
}

#[tokio::test]
async fn foreign_private_plugin_is_not_found() {
    let (_fx, resolver) = fixture().await;

    match resolver.resolve_str("other", "acme/secret") {
        Err(CloudwayError::PluginNotFound { tag }) => assert_eq!(tag, "acme/secret"),
        other => panic!("expected PluginNotFound, got {other:?}"),
    }
    // The owner can still see it.
    assert!(resolver.resolve_str("acme", "acme/secret").is_ok());
}

#[tokio::test]
async fn foreign_version_miss_does_not_reveal_existence() {
    let (_fx, resolver) = fixture().await;
    assert!(matches!(
        resolver.resolve_str("other", "acme/secret:9.9"),
        Err(CloudwayError::PluginNotFound { .. })
    ));
    assert!(matches!(
        resolver.resolve_str("acme", "acme/secret:9.9"),
        Err(CloudwayError::VersionNotFound { .. })
    ));
}

#[tokio::test]
async fn shared_plugins_resolve_across_namespaces() {
    let (_fx, resolver) = fixture().await;
    let commons = resolver.resolve_str("other", "acme/commons").unwrap();
    assert_eq!(commons.namespace, "acme");
    assert!(commons.shared);
}

#[tokio::test]
async fn version_miss_is_reported_over_system_miss() {
    let (_fx, resolver) = fixture().await;
    assert!(matches!(
        resolver.resolve_str("acme", "commons:2.0"),
        Err(CloudwayError::VersionNotFound { .. })
    ));
}

#[tokio::test]
async fn service_role_is_ignored_for_resolution() {
    let (_fx, resolver) = fixture().await;
    let mysql = resolver.resolve_str("acme", "db:mysql").unwrap();
    assert_eq!(mysql.name, "mysql");
}

#[tokio::test]
async fn malformed_tags_are_parse_errors() {
    let (_fx, resolver) = fixture().await;
    assert!(matches!(
        resolver.resolve_str("acme", "a/b/c"),
        Err(CloudwayError::Parse { .. })
    ));
}

#[tokio::test]
async fn merged_catalog_is_unique_overridden_and_sorted() {
    let (_fx, resolver) = fixture().await;
    let plugins = resolver.installed_plugins("acme", None).unwrap();

    let names: Vec<&str> = plugins.iter().map(|p| p.name.as_str()).collect();
    let mut unique = names.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(names.len(), unique.len(), "duplicate names in {names:?}");

    let php = plugins.iter().find(|p| p.name == "php").unwrap();
    assert_eq!(php.namespace, "acme");

    let display: Vec<&str> = plugins.iter().map(|p| p.display_name.as_str()).collect();
    let mut sorted = display.clone();
    sorted.sort();
    assert_eq!(display, sorted);
    assert_eq!(plugins.len(), 5);
}

#[tokio::test]
async fn catalogs_filter_by_category() {
    let (_fx, resolver) = fixture().await;
    let frameworks = resolver
        .installed_plugins("acme", Some(Category::Framework))
        .unwrap();
    assert!(frameworks.iter().all(|p| p.category == Category::Framework));
    assert_eq!(frameworks.len(), 2);

    let system_only = resolver.installed_plugins("", None).unwrap();
    assert_eq!(system_only.len(), 3);
    assert!(system_only.iter().all(|p| p.is_system()));
}

#[tokio::test]
async fn user_catalog_lists_own_plugins_only() {
    let (_fx, resolver) = fixture().await;
    let own = resolver.user_plugins("acme", None).unwrap();
    let names: Vec<&str> = own.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["commons", "php", "secret"]);
    assert!(resolver.user_plugins("", None).unwrap().is_empty());
}

#[tokio::test]
async fn namespace_outside_hub_rules_still_sees_system_plugins() {
    let (_fx, resolver) = fixture().await;

    let php = resolver.resolve_str("Acme", "php").unwrap();
    assert!(php.is_system());
    assert_eq!(php.version, "7.0");
    assert!(matches!(
        resolver.resolve_str("team.x", "nope"),
        Err(CloudwayError::PluginNotFound { .. })
    ));

    let catalog = resolver.installed_plugins("team.x", None).unwrap();
    assert!(catalog.iter().all(|p| p.is_system()));
    assert_eq!(catalog.len(), 3);
    assert!(resolver.user_plugins("Acme", None).unwrap().is_empty());
}
