// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so typos are reported at
//! startup instead of silently falling back to defaults.

use serde::{Deserialize, Serialize};

/// Top-level Cloudway configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CloudwayConfig {
    /// Platform-wide identity and logging.
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Installed-plugin repository.
    #[serde(default)]
    pub hub: HubConfig,

    /// Routing backend.
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Public API endpoint used to derive application URLs.
    #[serde(default)]
    pub console: ConsoleConfig,

    /// Source-control integration.
    #[serde(default)]
    pub scm: ScmConfig,

    /// Application record storage.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl CloudwayConfig {
    /// The console URL, defaulting to `http://api.<domain>`.
    pub fn console_url(&self) -> String {
        self.console
            .url
            .clone()
            .unwrap_or_else(|| format!("http://api.{}", self.platform.domain))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformConfig {
    /// DNS domain applications are published under.
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            log_level: default_log_level(),
        }
    }
}

fn default_domain() -> String {
    "cloudway.local".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HubConfig {
    /// Root directory of the plugin tree.
    #[serde(default = "default_hub_dir")]
    pub dir: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            dir: default_hub_dir(),
        }
    }
}

fn default_hub_dir() -> String {
    "/var/lib/cloudway/plugins".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    /// Backend URL, e.g. `memory://` or `file:///var/lib/cloudway/routes.json`.
    /// `None` leaves routing unconfigured.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub url: Option<String>,

    /// Port of the SSH gateway advertised in application info.
    #[serde(default = "default_ssh_port")]
    pub ssh_port: u16,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            url: None,
            ssh_port: default_ssh_port(),
        }
    }
}

fn default_ssh_port() -> u16 {
    2200
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScmConfig {
    /// Clone URL template; `<namespace>` and `<repo>` are substituted.
    #[serde(default)]
    pub clone_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database holding application records.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("cloudway").join("cloudway.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("cloudway.db"))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_platform_conventions() {
        let config = CloudwayConfig::default();
        assert_eq!(config.platform.domain, "cloudway.local");
        assert_eq!(config.hub.dir, "/var/lib/cloudway/plugins");
        assert_eq!(config.console.ssh_port, 2200);
        assert!(config.proxy.url.is_none());
        assert!(config.storage.database_path.ends_with("cloudway.db"));
    }

    #[test]
    fn console_url_derives_from_domain() {
        let mut config = CloudwayConfig::default();
        config.platform.domain = "example.org".into();
        assert_eq!(config.console_url(), "http://api.example.org");

        config.console.url = Some("https://console.example.org:8443".into());
        assert_eq!(config.console_url(), "https://console.example.org:8443");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = toml::from_str::<CloudwayConfig>("[hub]\ndirectory = \"/tmp\"\n");
        assert!(result.is_err());
    }
}
