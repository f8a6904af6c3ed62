// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cloudway - administration tool for the Cloudway control plane.
//!
//! This is the binary entry point: plugin management against the hub,
//! application listing from the record store, and configuration checks.

mod app;
mod check;
mod output;
mod plugin;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::app::AppCommand;
use crate::check::ConfigCommand;
use crate::plugin::PluginCommand;

/// Cloudway - administration tool for the Cloudway control plane.
#[derive(Parser, Debug)]
#[command(name = "cloudway", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Install, remove, and inspect plugins.
    Plugin {
        #[command(subcommand)]
        action: PluginCommand,
    },
    /// Inspect applications.
    App {
        #[command(subcommand)]
        action: AppCommand,
    },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => cloudway_config::load_and_validate_path(path),
        None => cloudway_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            cloudway_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.platform.log_level);

    let result = match cli.command {
        Commands::Plugin { action } => plugin::run_plugin(&config, action, cli.json).await,
        Commands::App { action } => app::run_app(&config, action, cli.json).await,
        Commands::Config { action } => check::run_config(&config, action, cli.json).await,
    };

    match result {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("cloudway: {e}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cloudway={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
