// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin manifest parsing from `plugin.toml` files.
//!
//! Every installed plugin directory carries a manifest at its root:
//!
//! ```toml
//! [plugin]
//! name = "php"
//! display_name = "PHP 7"
//! version = "7.0.1"
//! category = "Framework"
//! shared = false
//!
//! [[endpoints]]
//! private_port = 8080
//! protocol = "http"
//! ```

use std::path::Path;
use std::str::FromStr;

use cloudway_core::{Category, CloudwayError, Endpoint, Plugin, PluginTag};
use serde::Deserialize;

/// File name of the manifest inside a plugin directory.
pub const MANIFEST_FILE: &str = "plugin.toml";

/// Intermediate TOML deserialization struct for `plugin.toml`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    plugin: PluginSection,
    #[serde(default)]
    endpoints: Vec<Endpoint>,
}

/// The `[plugin]` section.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PluginSection {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    version: String,
    category: String,
    #[serde(default)]
    shared: bool,
    #[serde(default)]
    description: String,
}

/// Parse a plugin manifest from TOML content.
///
/// The name and version must form a valid plugin tag and must not be hidden
/// or relative path components, since both become directory names in the hub.
/// A missing `display_name` defaults to the name.
pub fn parse_manifest(toml_content: &str) -> Result<Plugin, CloudwayError> {
    let file: ManifestFile = toml::from_str(toml_content)
        .map_err(|e| CloudwayError::Manifest(format!("invalid plugin manifest: {e}")))?;

    let section = file.plugin;

    if section.name.is_empty() {
        return Err(CloudwayError::Manifest(
            "plugin manifest: name must not be empty".to_string(),
        ));
    }
    if section.version.is_empty() {
        return Err(CloudwayError::Manifest(
            "plugin manifest: version must not be empty".to_string(),
        ));
    }
    for (field, value) in [("name", &section.name), ("version", &section.version)] {
        if value.starts_with('.') {
            return Err(CloudwayError::Manifest(format!(
                "plugin manifest: {field} `{value}` must not start with '.'"
            )));
        }
    }
    PluginTag::new("", section.name.as_str(), section.version.as_str()).map_err(|e| {
        CloudwayError::Manifest(format!("plugin manifest: {e}"))
    })?;

    let category = Category::from_str(&section.category).map_err(|_| {
        CloudwayError::Manifest(format!(
            "plugin manifest: invalid category '{}'. Expected one of: Framework, Service",
            section.category
        ))
    })?;

    let display_name = section
        .display_name
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| section.name.clone());

    Ok(Plugin {
        name: section.name,
        display_name,
        version: section.version,
        category,
        shared: section.shared,
        description: section.description,
        endpoints: file.endpoints,
        namespace: String::new(),
        path: None,
    })
}

/// Read and parse the manifest at the root of a plugin directory.
pub fn read_manifest(dir: &Path) -> Result<Plugin, CloudwayError> {
    let path = dir.join(MANIFEST_FILE);
    let content = std::fs::read_to_string(&path).map_err(|e| {
        CloudwayError::Manifest(format!("cannot read {}: {e}", path.display()))
    })?;
    parse_manifest(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_manifest() {
        let toml = r#"
[plugin]
name = "mysql"
display_name = "MySQL 5.5"
version = "5.5.62"
category = "Service"
shared = true
description = "Relational database"

[[endpoints]]
private_port = 3306
protocol = "tcp"
"#;
        let plugin = parse_manifest(toml).unwrap();
        assert_eq!(plugin.name, "mysql");
        assert_eq!(plugin.display_name, "MySQL 5.5");
        assert_eq!(plugin.version, "5.5.62");
        assert_eq!(plugin.category, Category::Service);
        assert!(plugin.shared);
        assert_eq!(plugin.endpoints.len(), 1);
        assert_eq!(plugin.endpoints[0].private_port, 3306);
        assert_eq!(plugin.endpoints[0].protocol, "tcp");
        assert_eq!(plugin.endpoints[0].frontend, "");
    }

    #[test]
    fn parse_minimal_manifest() {
        let toml = r#"
[plugin]
name = "php"
version = "7.0"
category = "Framework"
"#;
        let plugin = parse_manifest(toml).unwrap();
        assert_eq!(plugin.display_name, "php");
        assert!(!plugin.shared);
        assert!(plugin.endpoints.is_empty());
        assert!(plugin.namespace.is_empty());
    }

    #[test]
    fn parse_invalid_category() {
        let toml = r#"
[plugin]
name = "bad"
version = "1.0"
category = "Database"
"#;
        let err = parse_manifest(toml).unwrap_err().to_string();
        assert!(err.contains("invalid category"));
    }

    #[test]
    fn parse_missing_name() {
        let toml = r#"
[plugin]
name = ""
version = "1.0"
category = "Service"
"#;
        let err = parse_manifest(toml).unwrap_err().to_string();
        assert!(err.contains("name must not be empty"));
    }

    #[test]
    fn parse_rejects_path_like_components() {
        for (name, version) in [("..", "1.0"), (".hidden", "1.0"), ("a/b", "1.0"), ("php", "../1")] {
            let toml = format!(
                "[plugin]\nname = \"{name}\"\nversion = \"{version}\"\ncategory = \"Framework\"\n"
            );
            assert!(
                parse_manifest(&toml).is_err(),
                "expected {name}:{version} to be rejected"
            );
        }
    }

    #[test]
    fn parse_rejects_unknown_keys() {
        let toml = r#"
[plugin]
name = "php"
version = "7.0"
category = "Framework"
sharde = true
"#;
        assert!(parse_manifest(toml).is_err());
    }
}
