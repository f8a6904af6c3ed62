// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::CloudwayConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &CloudwayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let domain = config.platform.domain.trim();
    if domain.is_empty() {
        fail("platform.domain must not be empty".to_string());
    } else if !domain
        .split('.')
        .all(|label| !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
    {
        fail(format!("platform.domain `{domain}` is not a valid DNS name"));
    }

    if !LOG_LEVELS.contains(&config.platform.log_level.as_str()) {
        fail(format!(
            "platform.log_level `{}` must be one of: {}",
            config.platform.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.hub.dir.trim().is_empty() {
        fail("hub.dir must not be empty".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if let Err(e) = url::Url::parse(&config.console_url()) {
        fail(format!("console.url `{}` is not a valid URL: {e}", config.console_url()));
    }

    if let Some(proxy_url) = &config.proxy.url
        && !proxy_url.is_empty()
        && let Err(e) = url::Url::parse(proxy_url)
    {
        fail(format!("proxy.url `{proxy_url}` is not a valid URL: {e}"));
    }

    if let Some(template) = &config.scm.clone_url
        && !template.contains("<repo>")
    {
        fail(format!(
            "scm.clone_url `{template}` must contain the `<repo>` placeholder"
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
