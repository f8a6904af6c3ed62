// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cloudway plugin` command implementation.
//!
//! Works directly on the hub directory from the configuration. An empty
//! `--namespace` addresses the system scope.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Subcommand;
use cloudway_broker::Resolver;
use cloudway_config::CloudwayConfig;
use cloudway_core::{Category, CloudwayError, Plugin, PluginTag};
use cloudway_hub::Hub;
use tracing::warn;

use crate::output::{scope_label, to_json};

/// Plugin subcommands.
#[derive(Subcommand, Debug)]
pub enum PluginCommand {
    /// List the plugins a namespace can use.
    List {
        /// Caller namespace; empty lists the system catalog.
        #[arg(long, default_value = "")]
        namespace: String,
        /// Only list plugins of this category.
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,
        /// List every installed version in the namespace's own scope.
        #[arg(long)]
        all: bool,
    },
    /// Show the plugin a tag resolves to.
    Info {
        tag: String,
        #[arg(long, default_value = "")]
        namespace: String,
    },
    /// Install a plugin from a directory or a tar(.gz) archive.
    Install {
        path: PathBuf,
        #[arg(long, default_value = "")]
        namespace: String,
    },
    /// Remove one version, or every version, of a plugin.
    Remove {
        tag: String,
        #[arg(long, default_value = "")]
        namespace: String,
    },
}

fn parse_category(value: &str) -> Result<Category, String> {
    match value.to_ascii_lowercase().as_str() {
        "framework" => Ok(Category::Framework),
        "service" => Ok(Category::Service),
        _ => Err(format!("unknown category `{value}`, expected framework or service")),
    }
}

/// Run a `cloudway plugin` subcommand and return its rendered output.
pub async fn run_plugin(
    config: &CloudwayConfig,
    command: PluginCommand,
    json: bool,
) -> Result<String, CloudwayError> {
    let hub = Arc::new(Hub::open(&config.hub.dir)?);
    execute(hub, command, json).await
}

async fn execute(hub: Arc<Hub>, command: PluginCommand, json: bool) -> Result<String, CloudwayError> {
    let resolver = Resolver::new(hub.clone());
    match command {
        PluginCommand::List {
            namespace,
            category,
            all,
        } => {
            let plugins = if all {
                all_versions(&hub, &namespace, category)?
            } else {
                resolver.installed_plugins(&namespace, category)?
            };
            render_list(&plugins, json)
        }
        PluginCommand::Info { tag, namespace } => {
            let plugin = resolver.resolve_str(&namespace, &tag)?;
            render_info(&plugin, json)
        }
        PluginCommand::Install { path, namespace } => {
            let plugin = hub.install_plugin(&namespace, &path).await?;
            if json {
                to_json(&plugin)
            } else {
                Ok(format!("installed {} into {}", plugin.tag(), scope_label(&plugin)))
            }
        }
        PluginCommand::Remove { tag, namespace } => {
            let parsed = PluginTag::parse(&tag)?;
            hub.remove_plugin(&namespace, &parsed).await?;
            if json {
                to_json(&serde_json::json!({ "removed": parsed.clean().to_string() }))
            } else {
                Ok(format!("removed {}", parsed.clean()))
            }
        }
    }
}

/// Every installed version in one scope, grouped by name.
fn all_versions(
    hub: &Hub,
    namespace: &str,
    category: Option<Category>,
) -> Result<Vec<Plugin>, CloudwayError> {
    let mut names: Vec<String> = hub
        .list_plugins(namespace, category)?
        .into_iter()
        .map(|p| p.name)
        .collect();
    names.sort();

    let mut plugins = Vec::new();
    for name in names {
        for version in hub.versions(namespace, &name)? {
            let tag = PluginTag {
                namespace: namespace.to_string(),
                name: name.clone(),
                version,
                ..PluginTag::default()
            };
            match hub.plugin_info(&tag) {
                Ok(plugin) => plugins.push(plugin),
                Err(e) => warn!(tag = %tag, error = %e, "skipping unreadable plugin version"),
            }
        }
    }
    Ok(plugins)
}

fn render_list(plugins: &[Plugin], json: bool) -> Result<String, CloudwayError> {
    if json {
        return to_json(plugins);
    }
    if plugins.is_empty() {
        return Ok("no plugins installed".to_string());
    }
    let mut out = String::new();
    for p in plugins {
        let _ = writeln!(
            out,
            "{:<16} {:<10} {:<10} {:<10} {}",
            p.name,
            p.version,
            p.category,
            scope_label(p),
            p.display_name
        );
    }
    Ok(out.trim_end().to_string())
}

fn render_info(plugin: &Plugin, json: bool) -> Result<String, CloudwayError> {
    if json {
        return to_json(plugin);
    }
    let mut out = String::new();
    let _ = writeln!(out, "Name:        {}", plugin.name);
    let _ = writeln!(out, "Display:     {}", plugin.display_name);
    let _ = writeln!(out, "Version:     {}", plugin.version);
    let _ = writeln!(out, "Category:    {}", plugin.category);
    let _ = writeln!(out, "Scope:       {}", scope_label(plugin));
    let _ = writeln!(out, "Shared:      {}", plugin.shared);
    if !plugin.description.is_empty() {
        let _ = writeln!(out, "Description: {}", plugin.description);
    }
    for endpoint in &plugin.endpoints {
        let _ = writeln!(
            out,
            "Endpoint:    {}/{} {}",
            endpoint.private_port,
            endpoint.protocol,
            if endpoint.frontend.is_empty() { "/" } else { endpoint.frontend.as_str() }
        );
    }
    Ok(out.trim_end().to_string())
}
