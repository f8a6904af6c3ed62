// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cloudway app` command implementation.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use clap::Subcommand;
use cloudway_broker::BrokerSettings;
use cloudway_config::CloudwayConfig;
use cloudway_core::{ApplicationRecord, CloudwayError, UserRecordStore};
use cloudway_storage::{Database, SqliteRecordStore};
use serde::Serialize;

use crate::output::to_json;

/// Application subcommands.
#[derive(Subcommand, Debug)]
pub enum AppCommand {
    /// List a namespace's applications.
    List {
        #[arg(long)]
        namespace: String,
    },
}

/// One row of `cloudway app list`.
#[derive(Debug, Serialize)]
struct AppSummary {
    name: String,
    url: String,
    plugins: Vec<String>,
    scaling: u32,
    created_at: DateTime<Utc>,
}

/// Broker settings derived from the platform configuration.
pub fn broker_settings(config: &CloudwayConfig) -> BrokerSettings {
    BrokerSettings {
        domain: config.platform.domain.clone(),
        console_url: config.console_url(),
        ssh_port: config.console.ssh_port,
        clone_url: config.scm.clone_url.clone(),
    }
}

/// Run a `cloudway app` subcommand and return its rendered output.
pub async fn run_app(
    config: &CloudwayConfig,
    command: AppCommand,
    json: bool,
) -> Result<String, CloudwayError> {
    match command {
        AppCommand::List { namespace } => {
            let store =
                SqliteRecordStore::new(Database::open(&config.storage.database_path).await?);
            let records = store.list_applications(&namespace).await?;
            store.into_database().close().await?;
            let summaries = summarize(&broker_settings(config), &namespace, records)?;
            render_list(&summaries, json)
        }
    }
}

fn summarize(
    settings: &BrokerSettings,
    namespace: &str,
    records: Vec<ApplicationRecord>,
) -> Result<Vec<AppSummary>, CloudwayError> {
    records
        .into_iter()
        .map(|record| {
            let urls = settings.application_urls(&record.name, namespace)?;
            Ok(AppSummary {
                name: record.name,
                url: urls.url,
                plugins: record.plugins,
                scaling: record.scaling,
                created_at: record.created_at,
            })
        })
        .collect()
}

fn render_list(apps: &[AppSummary], json: bool) -> Result<String, CloudwayError> {
    if json {
        return to_json(apps);
    }
    if apps.is_empty() {
        return Ok("no applications".to_string());
    }
    let mut out = String::new();
    for app in apps {
        let _ = writeln!(
            out,
            "{:<16} x{:<3} {:<40} {}",
            app.name,
            app.scaling,
            app.url,
            app.plugins.join(",")
        );
    }
    Ok(out.trim_end().to_string())
}
