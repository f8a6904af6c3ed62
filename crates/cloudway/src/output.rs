// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared output helpers.

use cloudway_core::{CloudwayError, Plugin};
use serde::Serialize;

/// Pretty-printed JSON for `--json` output.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CloudwayError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CloudwayError::Internal(format!("failed to encode output: {e}")))
}

/// Scope label of a plugin for text output.
pub fn scope_label(plugin: &Plugin) -> &str {
    if plugin.is_system() {
        "system"
    } else {
        &plugin.namespace
    }
}
