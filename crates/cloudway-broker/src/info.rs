// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-side application views and the settings used to build them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use cloudway_core::{Branch, CloudwayError, Plugin};

/// Platform facts the broker needs to describe applications.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    /// DNS domain applications are published under.
    pub domain: String,
    /// Public API endpoint; its scheme and port are reused for app URLs.
    pub console_url: String,
    pub ssh_port: u16,
    /// Clone URL template with `<namespace>` and `<repo>` placeholders.
    pub clone_url: Option<String>,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            domain: "cloudway.local".to_string(),
            console_url: "http://api.cloudway.local".to_string(),
            ssh_port: 2200,
            clone_url: None,
        }
    }
}

/// Public URLs of one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationUrls {
    pub url: String,
    pub ssh_url: String,
    pub clone_url: Option<String>,
}

impl BrokerSettings {
    /// Derives the URLs of application `name` in `namespace`.
    ///
    /// The web URL is `<scheme>://<name>-<namespace>.<domain>[:port]`, taking
    /// scheme and port from the console URL.
    pub fn application_urls(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<ApplicationUrls, CloudwayError> {
        let console = Url::parse(&self.console_url).map_err(|e| {
            CloudwayError::Config(format!("invalid console URL `{}`: {e}", self.console_url))
        })?;
        let port = console.port().map(|p| format!(":{p}")).unwrap_or_default();
        let host = console.host_str().unwrap_or(&self.domain);
        let prefix = format!("{name}-{namespace}");

        Ok(ApplicationUrls {
            url: format!("{}://{prefix}.{}{port}", console.scheme(), self.domain),
            ssh_url: format!("ssh://{prefix}@{host}:{}", self.ssh_port),
            clone_url: self.clone_url.as_ref().map(|template| {
                template
                    .replace("<namespace>", namespace)
                    .replace("<repo>", name)
            }),
        })
    }
}

/// Everything a client needs to know about an application.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationInfo {
    pub name: String,
    pub namespace: String,
    pub created_at: DateTime<Utc>,
    pub url: String,
    pub ssh_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clone_url: Option<String>,
    pub framework: Option<Plugin>,
    pub services: Vec<Plugin>,
    /// Live framework replicas.
    pub scaling: usize,
}

/// Deployed branch and the branches available for deployment.
#[derive(Debug, Clone, Serialize)]
pub struct Deployments {
    pub current: Branch,
    pub branches: Vec<Branch>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_follow_console_scheme_and_port() {
        let settings = BrokerSettings {
            domain: "example.com".to_string(),
            console_url: "https://api.example.com:8443".to_string(),
            ssh_port: 2200,
            clone_url: Some("ssh://git@git.example.com/<namespace>/<repo>.git".to_string()),
        };
        let urls = settings.application_urls("blog", "acme").unwrap();
        assert_eq!(urls.url, "https://blog-acme.example.com:8443");
        assert_eq!(urls.ssh_url, "ssh://blog-acme@api.example.com:2200");
        assert_eq!(
            urls.clone_url.as_deref(),
            Some("ssh://git@git.example.com/acme/blog.git")
        );
    }

    #[test]
    fn default_port_is_omitted() {
        let urls = BrokerSettings::default()
            .application_urls("shop", "acme")
            .unwrap();
        assert_eq!(urls.url, "http://shop-acme.cloudway.local");
        assert!(urls.clone_url.is_none());
    }

    #[test]
    fn bad_console_url_is_config_error() {
        let settings = BrokerSettings {
            console_url: "::".to_string(),
            ..BrokerSettings::default()
        };
        assert!(matches!(
            settings.application_urls("a", "b"),
            Err(CloudwayError::Config(_))
        ));
    }
}
