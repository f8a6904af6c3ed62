// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application lifecycle against the in-memory collaborators.

use std::collections::BTreeMap;

use cloudway_broker::{BrokerSettings, CreateApplication, ScaleRequest};
use cloudway_core::{Category, CloudwayError, ContainerRuntime, Identity, ServiceFilter};
use cloudway_test_utils::{BrokerHarness, ProxyCall, RuntimeOp};

const NS: &str = "acme";

async fn harness() -> BrokerHarness {
    let mut h = BrokerHarness::new().unwrap();
    h.fixture.framework("", "php", "7.0").await.unwrap();
    h.fixture.service("", "mysql", "5.5").await.unwrap();
    h.fixture.service("", "redis", "3.2").await.unwrap();
    h
}

async fn create_blog(h: &BrokerHarness) {
    h.user("alice", NS)
        .create_application(CreateApplication::new("blog", "php").with_service("mysql"))
        .await
        .unwrap();
}

#[tokio::test]
async fn create_builds_stopped_containers_and_record() {
    let h = harness().await;
    let containers = h
        .user("alice", NS)
        .create_application(
            CreateApplication::new("blog", "php")
                .with_service("mysql")
                .with_service("cache:redis"),
        )
        .await
        .unwrap();

    assert_eq!(containers.len(), 3);
    assert_eq!(containers[0].category, Category::Framework);
    assert_eq!(containers[2].service_name(), "cache");
    assert_eq!(h.runtime.running_count().await, 0);
    assert!(h.proxy.calls().await.is_empty());

    let records = h.user("alice", NS).list_applications().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].plugins, ["php:7.0", "mysql:5.5", "cache:redis:3.2"]);
    assert_eq!(records[0].scaling, 1);
}

#[tokio::test]
async fn create_with_scaling_adds_framework_replicas() {
    let h = harness().await;
    h.user("alice", NS)
        .create_application(
            CreateApplication::new("blog", "php")
                .with_service("mysql")
                .with_scaling(3),
        )
        .await
        .unwrap();

    let user = h.user("alice", NS);
    let frameworks = user
        .find_containers("blog", &ServiceFilter::Framework)
        .await
        .unwrap();
    assert_eq!(frameworks.len(), 3);
    let all = user.find_containers("blog", &ServiceFilter::All).await.unwrap();
    assert_eq!(all.len(), 4);
}

#[tokio::test]
async fn invalid_names_create_nothing() {
    let h = harness().await;
    for name in ["", "Blog", "9lives", "my-app", "a b"] {
        let result = h
            .user("alice", NS)
            .create_application(CreateApplication::new(name, "php"))
            .await;
        assert!(
            matches!(result, Err(CloudwayError::Validation(_))),
            "{name:?} should be rejected"
        );
    }
    // Name checks come before the namespace check.
    assert!(matches!(
        h.user("anon", "")
            .create_application(CreateApplication::new("Bad", "php"))
            .await,
        Err(CloudwayError::Validation(_))
    ));
    assert_eq!(h.runtime.create_calls().await, 0);
    assert!(h.records.is_empty().await);
}

#[tokio::test]
async fn empty_framework_and_zero_scaling_are_rejected() {
    let h = harness().await;
    let user = h.user("alice", NS);
    assert!(matches!(
        user.create_application(CreateApplication::new("blog", " ")).await,
        Err(CloudwayError::Validation(_))
    ));
    assert!(matches!(
        user.create_application(CreateApplication::new("blog", "php").with_scaling(0))
            .await,
        Err(CloudwayError::Validation(_))
    ));
    assert_eq!(h.runtime.create_calls().await, 0);
}

#[tokio::test]
async fn create_requires_namespace() {
    let h = harness().await;
    match h
        .user("anon", "")
        .create_application(CreateApplication::new("blog", "php"))
        .await
    {
        Err(CloudwayError::NoNamespace { user }) => assert_eq!(user, "anon"),
        other => panic!("expected NoNamespace, got {other:?}"),
    }
}

#[tokio::test]
async fn resolution_failure_has_no_side_effects() {
    let h = harness().await;
    let result = h
        .user("alice", NS)
        .create_application(CreateApplication::new("blog", "php").with_service("mongodb"))
        .await;
    assert!(matches!(result, Err(CloudwayError::PluginNotFound { .. })));
    assert_eq!(h.runtime.create_calls().await, 0);
    assert!(h.records.is_empty().await);
}

#[tokio::test]
async fn categories_are_checked_per_slot() {
    let h = harness().await;
    let user = h.user("alice", NS);
    assert!(matches!(
        user.create_application(CreateApplication::new("blog", "mysql")).await,
        Err(CloudwayError::Validation(_))
    ));
    assert!(matches!(
        user.create_application(CreateApplication::new("blog", "php").with_service("php"))
            .await,
        Err(CloudwayError::Validation(_))
    ));
    assert_eq!(h.runtime.create_calls().await, 0);
}

#[tokio::test]
async fn duplicate_application_is_a_conflict() {
    let h = harness().await;
    create_blog(&h).await;
    assert!(matches!(
        h.user("alice", NS)
            .create_application(CreateApplication::new("blog", "php"))
            .await,
        Err(CloudwayError::ApplicationExists { .. })
    ));
    // The same name in another namespace is independent.
    h.user("bob", "bobs")
        .create_application(CreateApplication::new("blog", "php"))
        .await
        .unwrap();
}

#[tokio::test]
async fn start_runs_everything_and_publishes_endpoints() {
    let h = harness().await;
    create_blog(&h).await;
    let user = h.user("alice", NS);

    user.start_application("blog").await.unwrap();
    assert_eq!(h.runtime.running_count().await, 2);
    assert_eq!(h.proxy.routed().await.len(), 2);

    // Starting again is not an error.
    user.start_application("blog").await.unwrap();
    assert_eq!(h.runtime.running_count().await, 2);
}

#[tokio::test]
async fn start_containers_starts_the_given_set() {
    let h = harness().await;
    let user = h.user("alice", NS);
    let created = user
        .create_application(CreateApplication::new("blog", "php"))
        .await
        .unwrap();
    user.start_containers(&created).await.unwrap();
    assert!(h.runtime.is_running(&created[0].id).await);

    let foreign = h.user("mallory", "evil");
    assert!(matches!(
        foreign.start_containers(&created).await,
        Err(CloudwayError::Validation(_))
    ));
}

#[tokio::test]
async fn start_aborts_on_first_failure() {
    let h = harness().await;
    create_blog(&h).await;
    let containers = h.runtime.containers().await;
    h.runtime
        .fail_container(RuntimeOp::Start, &containers[0].id)
        .await;

    let result = h.user("alice", NS).start_application("blog").await;
    assert!(matches!(result, Err(CloudwayError::Runtime { .. })));
    assert_eq!(h.runtime.running_count().await, 0);
}

#[tokio::test]
async fn stop_is_best_effort_and_reports_first_error() {
    let h = harness().await;
    create_blog(&h).await;
    let user = h.user("alice", NS);
    user.start_application("blog").await.unwrap();

    let containers = h.runtime.containers().await;
    h.runtime
        .fail_container(RuntimeOp::Stop, &containers[0].id)
        .await;

    match user.stop_application("blog").await {
        Err(CloudwayError::Runtime { container, .. }) => {
            assert_eq!(container.as_deref(), Some(containers[0].id.as_str()));
        }
        other => panic!("expected runtime error, got {other:?}"),
    }
    assert!(h.runtime.is_running(&containers[0].id).await);
    assert!(!h.runtime.is_running(&containers[1].id).await);
    // Endpoints were retracted from every container before stopping.
    assert!(h.proxy.routed().await.is_empty());
}

#[tokio::test]
async fn restart_republishes_endpoints() {
    let h = harness().await;
    create_blog(&h).await;
    let user = h.user("alice", NS);
    user.restart_application("blog").await.unwrap();
    assert_eq!(h.runtime.running_count().await, 2);

    let calls = h.proxy.calls().await;
    let first = &h.runtime.containers().await[0].id;
    assert_eq!(
        &calls[..2],
        &[ProxyCall::Remove(first.clone()), ProxyCall::Add(first.clone())]
    );
}

#[tokio::test]
async fn lifecycle_of_unknown_application_is_not_found() {
    let h = harness().await;
    let user = h.user("alice", NS);
    assert!(matches!(
        user.start_application("ghost").await,
        Err(CloudwayError::ApplicationNotFound { .. })
    ));
    assert!(matches!(
        user.scale_application("ghost", 2).await,
        Err(CloudwayError::ApplicationNotFound { .. })
    ));
    assert!(matches!(
        user.remove_application("ghost").await,
        Err(CloudwayError::ApplicationNotFound { .. })
    ));
}

#[tokio::test]
async fn scale_is_idempotent() {
    let h = harness().await;
    create_blog(&h).await;
    let user = h.user("alice", NS);

    let replicas = user.scale_application("blog", 3).await.unwrap();
    assert_eq!(replicas.len(), 3);
    assert!(replicas.iter().all(|c| c.category == Category::Framework));
    let creates = h.runtime.create_calls().await;

    let again = user.scale_application("blog", 3).await.unwrap();
    assert_eq!(again.len(), 3);
    assert_eq!(h.runtime.create_calls().await, creates);

    let record = &user.list_applications().await.unwrap()[0];
    assert_eq!(record.scaling, 3);
}

#[tokio::test]
async fn scale_down_removes_newest_replicas() {
    let h = harness().await;
    create_blog(&h).await;
    let user = h.user("alice", NS);
    let grown = user.scale_application("blog", 3).await.unwrap();

    let shrunk = user.scale_application("blog", 1).await.unwrap();
    assert_eq!(shrunk.len(), 1);
    assert_eq!(shrunk[0].id, grown[0].id);
    // The service container is untouched.
    assert_eq!(h.runtime.container_count().await, 2);
    assert_eq!(user.list_applications().await.unwrap()[0].scaling, 1);
}

#[tokio::test]
async fn scale_rejects_zero() {
    let h = harness().await;
    create_blog(&h).await;
    assert!(matches!(
        h.user("alice", NS).scale_application("blog", 0).await,
        Err(CloudwayError::Validation(_))
    ));
}

#[tokio::test]
async fn relative_scale_uses_live_count() {
    let h = harness().await;
    create_blog(&h).await;
    let user = h.user("alice", NS);

    let grown = user.scale_by("blog", ScaleRequest::parse("+2").unwrap()).await.unwrap();
    assert_eq!(grown.len(), 3);
    let shrunk = user.scale_by("blog", ScaleRequest::Down(1)).await.unwrap();
    assert_eq!(shrunk.len(), 2);
    assert_eq!(user.list_applications().await.unwrap()[0].scaling, 2);

    assert!(matches!(
        user.scale_by("blog", ScaleRequest::Down(5)).await,
        Err(CloudwayError::Validation(_))
    ));
    assert_eq!(h.runtime.container_count().await, 3);
}

#[tokio::test]
async fn scale_up_without_live_replicas_uses_record() {
    let h = harness().await;
    create_blog(&h).await;
    let framework = h.runtime.containers().await[0].clone();
    h.runtime.destroy(&framework).await.unwrap();

    let replicas = h
        .user("alice", NS)
        .scale_application("blog", 2)
        .await
        .unwrap();
    assert_eq!(replicas.len(), 2);
    assert_eq!(replicas[0].tag.name, "php");
}

#[tokio::test]
async fn scale_up_from_record_keeps_created_version() {
    let mut h = harness().await;
    create_blog(&h).await;
    h.fixture.framework("", "php", "7.4").await.unwrap();
    h.fixture.framework(NS, "php", "8.0").await.unwrap();
    let framework = h.runtime.containers().await[0].clone();
    h.runtime.destroy(&framework).await.unwrap();

    let replicas = h
        .user("alice", NS)
        .scale_application("blog", 2)
        .await
        .unwrap();
    assert!(
        replicas
            .iter()
            .all(|r| r.tag.version == "7.0" && r.tag.namespace.is_empty())
    );
}

#[tokio::test]
async fn scale_up_ignores_later_tenant_plugin_of_same_name() {
    let mut h = harness().await;
    create_blog(&h).await;
    h.fixture.framework(NS, "php", "7.0").await.unwrap();

    let replicas = h
        .user("alice", NS)
        .scale_application("blog", 3)
        .await
        .unwrap();
    assert_eq!(replicas.len(), 3);
    assert!(replicas.iter().all(|r| r.tag.namespace.is_empty()));
}

#[tokio::test]
async fn concurrent_scale_and_stop_serialize() {
    for _ in 0..10 {
        let h = harness().await;
        create_blog(&h).await;
        h.user("alice", NS).start_application("blog").await.unwrap();

        let scaler = {
            let broker = h.broker.clone();
            tokio::spawn(async move {
                broker
                    .for_user(Identity::new("alice", NS))
                    .scale_application("blog", 5)
                    .await
            })
        };
        let stopper = {
            let broker = h.broker.clone();
            tokio::spawn(async move {
                broker
                    .for_user(Identity::new("alice", NS))
                    .stop_application("blog")
                    .await
            })
        };
        scaler.await.unwrap().unwrap();
        stopper.await.unwrap().unwrap();

        let frameworks = h
            .user("alice", NS)
            .find_containers("blog", &ServiceFilter::Framework)
            .await
            .unwrap();
        assert_eq!(frameworks.len(), 5);
        assert_eq!(h.runtime.running_count().await, 0);

        // Stops form one contiguous block: no create landed in the middle.
        let ops = h.runtime.operations().await;
        let stops: Vec<usize> = ops
            .iter()
            .enumerate()
            .filter(|(_, op)| **op == RuntimeOp::Stop)
            .map(|(i, _)| i)
            .collect();
        let (first, last) = (stops[0], stops[stops.len() - 1]);
        assert_eq!(last - first + 1, stops.len(), "interleaved: {ops:?}");
    }
}

#[tokio::test]
async fn remove_destroys_containers_and_record() {
    let h = harness().await;
    create_blog(&h).await;
    let user = h.user("alice", NS);
    user.start_application("blog").await.unwrap();

    user.remove_application("blog").await.unwrap();
    assert_eq!(h.runtime.container_count().await, 0);
    assert!(h.records.is_empty().await);
    assert!(h.proxy.routed().await.is_empty());
}

#[tokio::test]
async fn failed_remove_keeps_record_for_retry() {
    let h = harness().await;
    create_blog(&h).await;
    let user = h.user("alice", NS);
    let containers = h.runtime.containers().await;
    h.runtime
        .fail_container(RuntimeOp::Destroy, &containers[1].id)
        .await;

    assert!(user.remove_application("blog").await.is_err());
    assert_eq!(h.runtime.container_count().await, 1);
    assert_eq!(h.records.len().await, 1);

    h.runtime.clear_failures().await;
    user.remove_application("blog").await.unwrap();
    assert!(h.records.is_empty().await);
}

#[tokio::test]
async fn proxy_failures_do_not_fail_lifecycle() {
    let h = harness().await;
    create_blog(&h).await;
    h.proxy.set_failing(true);

    let user = h.user("alice", NS);
    user.start_application("blog").await.unwrap();
    assert_eq!(h.runtime.running_count().await, 2);
    user.stop_application("blog").await.unwrap();
    assert_eq!(h.runtime.running_count().await, 0);
    assert!(!h.proxy.calls().await.is_empty());
}

#[tokio::test]
async fn application_info_describes_urls_and_plugins() {
    let mut h = BrokerHarness::with_settings(BrokerSettings {
        domain: "example.com".to_string(),
        console_url: "https://api.example.com:8443".to_string(),
        ssh_port: 2222,
        clone_url: Some("git@git.example.com:<namespace>/<repo>.git".to_string()),
    })
    .unwrap();
    h.fixture.framework("", "php", "7.0").await.unwrap();
    h.fixture.service("", "mysql", "5.5").await.unwrap();
    create_blog(&h).await;

    let info = h.user("alice", NS).application_info("blog").await.unwrap();
    assert_eq!(info.url, "https://blog-acme.example.com:8443");
    assert_eq!(info.ssh_url, "ssh://blog-acme@api.example.com:2222");
    assert_eq!(info.clone_url.as_deref(), Some("git@git.example.com:acme/blog.git"));
    assert_eq!(info.framework.as_ref().map(|p| p.name.as_str()), Some("php"));
    assert!(info.framework.as_ref().is_some_and(|p| p.path.is_none()));
    assert_eq!(info.services.len(), 1);
    assert_eq!(info.scaling, 1);

    let json = serde_json::to_value(&info).unwrap();
    assert!(json["framework"].get("path").is_none());
}

#[tokio::test]
async fn environment_round_trip_through_exec() {
    let h = harness().await;
    create_blog(&h).await;
    let user = h.user("alice", NS);

    let bad = BTreeMap::from([("BAD-KEY".to_string(), "x".to_string())]);
    assert!(matches!(
        user.set_environment("blog", "php", &bad, false).await,
        Err(CloudwayError::Validation(_))
    ));
    assert!(h.runtime.exec_calls().await.is_empty());

    let env = BTreeMap::from([("DEBUG".to_string(), "1".to_string())]);
    user.set_environment("blog", "php", &env, false).await.unwrap();
    let calls = h.runtime.exec_calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].user, "root");
    assert_eq!(calls[0].args, ["/usr/bin/cwctl", "setenv", "--export", "DEBUG=1"]);

    let current = user.environment("blog", "php").await.unwrap();
    assert_eq!(current.get("DEBUG").map(String::as_str), Some("1"));
    assert_eq!(current.get("CLOUDWAY_APP_NAME").map(String::as_str), Some("blog"));

    user.set_environment("blog", "php", &env, true).await.unwrap();
    assert!(!user.environment("blog", "php").await.unwrap().contains_key("DEBUG"));

    assert!(matches!(
        user.environment("blog", "mongodb").await,
        Err(CloudwayError::ApplicationNotFound { .. })
    ));
}

#[tokio::test]
async fn deploy_passes_through_to_scm() {
    let h = harness().await;
    create_blog(&h).await;
    let user = h.user("alice", NS);

    user.deploy("blog", "develop").await.unwrap();
    assert_eq!(
        h.scm.deploys().await,
        [("acme".to_string(), "blog".to_string(), "develop".to_string())]
    );

    let deployments = user.deployments("blog").await.unwrap();
    assert_eq!(deployments.current.display_id, "develop");
    assert_eq!(deployments.branches.len(), 2);

    assert!(matches!(
        user.deploy("ghost", "master").await,
        Err(CloudwayError::ApplicationNotFound { .. })
    ));
}

#[tokio::test]
async fn plugin_management_is_scoped_to_the_caller() {
    let mut h = harness().await;
    let src = h
        .fixture
        .write_source("go", "1.6", Category::Framework, false)
        .unwrap();

    assert!(matches!(
        h.user("anon", "").install_plugin(&src).await,
        Err(CloudwayError::NoNamespace { .. })
    ));

    let user = h.user("alice", NS);
    let installed = user.install_plugin(&src).await.unwrap();
    assert_eq!(installed.namespace, NS);
    assert!(installed.path.is_none());
    assert_eq!(user.user_plugins(None).unwrap().len(), 1);
    assert_eq!(user.installed_plugins(None).unwrap().len(), 4);
    assert_eq!(user.plugin_info("go").unwrap().version, "1.6");

    // Other tenants cannot see or remove it.
    let bob = h.user("bob", "bobs");
    assert!(bob.plugin_info("acme/go").is_err());
    assert!(matches!(
        bob.remove_plugin("acme/go").await,
        Err(CloudwayError::PluginNotFound { .. })
    ));

    user.remove_plugin("go").await.unwrap();
    assert!(user.user_plugins(None).unwrap().is_empty());
}

#[tokio::test]
async fn lock_table_does_not_grow_with_unknown_names() {
    let h = harness().await;
    create_blog(&h).await;
    let user = h.user("alice", NS);

    for i in 0..1000 {
        let result = user.stop_application(&format!("ghost{i}")).await;
        assert!(matches!(result, Err(CloudwayError::ApplicationNotFound { .. })));
    }
    user.start_application("blog").await.unwrap();
    user.scale_application("blog", 2).await.unwrap();

    assert_eq!(h.broker.busy_applications(), 0);
}
