// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the hub, resolver, broker, and collaborators.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::tag::PluginTag;

/// Role a plugin plays inside an application.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum Category {
    /// Primary runtime; drives the application URL and identity.
    Framework,
    /// Auxiliary dependency such as a database or cache.
    Service,
}

impl Category {
    pub fn is_framework(self) -> bool {
        self == Category::Framework
    }
}

/// A network port a plugin exposes inside its container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub private_port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Public path prefix routed to this port. Empty routes the whole host.
    #[serde(default)]
    pub frontend: String,
}

fn default_protocol() -> String {
    "http".to_string()
}

/// Metadata of an installed plugin (a cartridge manifest).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plugin {
    pub name: String,
    pub display_name: String,
    pub version: String,
    pub category: Category,
    /// Visible to callers outside the owning namespace.
    pub shared: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    /// Owning namespace; empty for system plugins. Assigned by the hub.
    #[serde(default)]
    pub namespace: String,
    /// Install location on disk. Never serialized to API clients.
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

impl Plugin {
    /// Returns a copy with the on-disk path removed.
    pub fn without_path(mut self) -> Self {
        self.path = None;
        self
    }

    /// Fully qualified tag pointing at exactly this installation.
    pub fn tag(&self) -> PluginTag {
        PluginTag {
            service: String::new(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.namespace.is_empty()
    }
}

/// Durable application metadata kept by a [`crate::traits::UserRecordStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub name: String,
    /// Plugin tags; the first entry is the framework.
    pub plugins: Vec<String>,
    pub scaling: u32,
    pub created_at: DateTime<Utc>,
}

impl ApplicationRecord {
    pub fn framework_tag(&self) -> Option<&str> {
        self.plugins.first().map(String::as_str)
    }
}

/// Opaque reference to a container owned by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerHandle {
    pub id: String,
    pub app: String,
    pub namespace: String,
    /// Tag of the plugin this container was created from.
    pub tag: PluginTag,
    pub category: Category,
    pub endpoints: Vec<Endpoint>,
    pub created_at: DateTime<Utc>,
}

impl ContainerHandle {
    /// Service name used to address this container; the plugin name unless the
    /// tag carries an explicit service role.
    pub fn service_name(&self) -> &str {
        if self.tag.service.is_empty() {
            &self.tag.name
        } else {
            &self.tag.service
        }
    }
}

/// A plugin paired with the tag it was resolved from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlugin {
    pub tag: PluginTag,
    pub plugin: Plugin,
}

/// Container creation intent handed to the runtime.
#[derive(Debug, Clone)]
pub struct CreateContainers {
    pub app: String,
    pub namespace: String,
    pub plugins: Vec<ResolvedPlugin>,
    /// Replicas to create for each plugin.
    pub count: u32,
}

/// Which containers of an application to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceFilter {
    /// Every container of the application.
    All,
    /// Framework replicas only.
    Framework,
    /// Containers of one named service.
    Service(String),
}

impl ServiceFilter {
    /// Maps the path-segment convention (`""`, `*`, `_` mean all) to a filter.
    pub fn from_segment(service: &str) -> Self {
        match service {
            "" | "*" | "_" => ServiceFilter::All,
            name => ServiceFilter::Service(name.to_string()),
        }
    }

    pub fn matches(&self, handle: &ContainerHandle) -> bool {
        match self {
            ServiceFilter::All => true,
            ServiceFilter::Framework => handle.category.is_framework(),
            ServiceFilter::Service(name) => handle.service_name() == name,
        }
    }
}

/// Outcome of a runtime state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Changed,
    /// The container was already in the requested state.
    Unchanged,
}

/// A verified caller, as supplied by the authenticator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    /// Tenant namespace; empty for system or anonymous users.
    pub namespace: String,
}

impl Identity {
    pub fn new(username: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            namespace: namespace.into(),
        }
    }
}

/// A source-control branch as reported by the SCM collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub display_id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(tag: &str, category: Category) -> ContainerHandle {
        ContainerHandle {
            id: "c1".into(),
            app: "blog".into(),
            namespace: "demo".into(),
            tag: tag.parse().unwrap(),
            category,
            endpoints: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn plugin_path_is_never_serialized() {
        let plugin = Plugin {
            name: "php".into(),
            display_name: "PHP".into(),
            version: "7.0".into(),
            category: Category::Framework,
            shared: false,
            description: String::new(),
            endpoints: vec![],
            namespace: String::new(),
            path: Some(PathBuf::from("/var/lib/cloudway/plugins/.cloudway/php/7.0")),
        };
        let json = serde_json::to_string(&plugin).unwrap();
        assert!(!json.contains("/var/lib"));
        assert!(plugin.without_path().path.is_none());
    }

    #[test]
    fn category_parses_from_manifest_strings() {
        assert_eq!("Framework".parse::<Category>().unwrap(), Category::Framework);
        assert_eq!("Service".parse::<Category>().unwrap(), Category::Service);
        assert!("Database".parse::<Category>().is_err());
    }

    #[test]
    fn service_filter_uses_service_role_before_plugin_name() {
        let db = handle("db:mysql", Category::Service);
        assert_eq!(db.service_name(), "db");
        assert!(ServiceFilter::Service("db".into()).matches(&db));
        assert!(!ServiceFilter::Service("mysql".into()).matches(&db));

        let web = handle("php:7.0", Category::Framework);
        assert_eq!(web.service_name(), "php");
        assert!(ServiceFilter::Framework.matches(&web));
        assert!(!ServiceFilter::Framework.matches(&db));
    }

    #[test]
    fn wildcard_segments_select_all_services() {
        for seg in ["", "*", "_"] {
            assert_eq!(ServiceFilter::from_segment(seg), ServiceFilter::All);
        }
        assert_eq!(
            ServiceFilter::from_segment("redis"),
            ServiceFilter::Service("redis".into())
        );
    }
}
