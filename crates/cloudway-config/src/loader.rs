// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./cloudway.toml` > `~/.config/cloudway/cloudway.toml` >
//! `/etc/cloudway/cloudway.toml`, with `CLOUDWAY_` environment overrides on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CloudwayConfig;

pub const SYSTEM_CONFIG_PATH: &str = "/etc/cloudway/cloudway.toml";
pub const LOCAL_CONFIG_PATH: &str = "cloudway.toml";

/// Path of the per-user config file, if a config dir exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cloudway/cloudway.toml"))
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/cloudway/cloudway.toml`
/// 3. `~/.config/cloudway/cloudway.toml`
/// 4. `./cloudway.toml`
/// 5. `CLOUDWAY_*` environment variables
pub fn load_config() -> Result<CloudwayConfig, figment::Error> {
    build_figment().extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(CloudwayConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<CloudwayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CloudwayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CloudwayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CloudwayConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Environment provider with explicit section mapping.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `CLOUDWAY_STORAGE_DATABASE_PATH` maps to `storage.database_path`.
/// `CLOUDWAY_DOMAIN` is accepted as a shorthand for `platform.domain`.
fn env_provider() -> Env {
    Env::prefixed("CLOUDWAY_").map(|key| {
        let key_str = key.as_str();
        if key_str == "domain" {
            return "platform.domain".into();
        }
        for section in ["platform", "hub", "proxy", "console", "scm", "storage"] {
            if let Some(rest) = key_str
                .strip_prefix(section)
                .and_then(|r| r.strip_prefix('_'))
            {
                return format!("{section}.{rest}").into();
            }
        }
        key_str.to_string().into()
    })
}
