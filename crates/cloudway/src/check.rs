// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cloudway config check` command implementation.
//!
//! Configuration has already been loaded and validated by the time this
//! runs; the check additionally opens the configured proxy backend and
//! reports where the hub and database live.

use std::fmt::Write as _;
use std::path::Path;

use clap::Subcommand;
use cloudway_config::CloudwayConfig;
use cloudway_core::CloudwayError;
use cloudway_proxy::ProxyRegistry;
use serde::Serialize;
use tracing::debug;

use crate::output::to_json;

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Validate configuration and open the proxy backend.
    Check,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    domain: String,
    console_url: String,
    hub_dir: String,
    hub_exists: bool,
    database_path: String,
    /// Scheme of the configured proxy backend, if any.
    proxy: Option<String>,
}

/// Run a `cloudway config` subcommand and return its rendered output.
pub async fn run_config(
    config: &CloudwayConfig,
    command: ConfigCommand,
    json: bool,
) -> Result<String, CloudwayError> {
    match command {
        ConfigCommand::Check => {
            let report = check(config, &ProxyRegistry::with_builtin_backends()).await?;
            render(&report, json)
        }
    }
}

async fn check(config: &CloudwayConfig, registry: &ProxyRegistry) -> Result<CheckReport, CloudwayError> {
    let proxy = match config.proxy.url.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(url) => {
            let proxy = registry.open(url)?;
            proxy.close().await?;
            debug!(url, "proxy backend reachable");
            url.split_once(':').map(|(scheme, _)| scheme.to_string())
        }
        None => None,
    };

    Ok(CheckReport {
        domain: config.platform.domain.clone(),
        console_url: config.console_url(),
        hub_dir: config.hub.dir.clone(),
        hub_exists: Path::new(&config.hub.dir).is_dir(),
        database_path: config.storage.database_path.clone(),
        proxy,
    })
}

fn render(report: &CheckReport, json: bool) -> Result<String, CloudwayError> {
    if json {
        return to_json(report);
    }
    let mut out = String::new();
    let _ = writeln!(out, "domain:   {}", report.domain);
    let _ = writeln!(out, "console:  {}", report.console_url);
    let _ = writeln!(
        out,
        "hub:      {}{}",
        report.hub_dir,
        if report.hub_exists { "" } else { " (missing)" }
    );
    let _ = writeln!(out, "database: {}", report.database_path);
    let _ = writeln!(
        out,
        "proxy:    {}",
        report.proxy.as_deref().unwrap_or("not configured")
    );
    out.push_str("configuration OK");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_without_proxy() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = cloudway_config::load_and_validate_str(&format!(
            "[hub]\ndir = \"{}\"\n",
            dir.path().display()
        ))
        .unwrap();
        let out = run_config(&cfg, ConfigCommand::Check, false).await.unwrap();
        assert!(out.contains("proxy:    not configured"));
        assert!(!out.contains("(missing)"));
        assert!(out.ends_with("configuration OK"));
    }

    #[tokio::test]
    async fn opens_configured_proxy() {
        let cfg = cloudway_config::load_and_validate_str(
            "[hub]\ndir = \"/nonexistent/cloudway/hub\"\n\n[proxy]\nurl = \"memory://\"\n",
        )
        .unwrap();
        let report = check(&cfg, &ProxyRegistry::with_builtin_backends()).await.unwrap();
        assert_eq!(report.proxy.as_deref(), Some("memory"));
        assert!(!report.hub_exists);
    }

    #[tokio::test]
    async fn unknown_proxy_scheme_fails() {
        let cfg = cloudway_config::load_and_validate_str("[proxy]\nurl = \"redis://localhost\"\n")
            .unwrap();
        let err = check(&cfg, &ProxyRegistry::with_builtin_backends())
            .await
            .unwrap_err();
        assert!(matches!(err, CloudwayError::UnsupportedScheme { .. }));
    }
}
