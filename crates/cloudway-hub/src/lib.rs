// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Versioned plugin repository.
//!
//! The hub stores every installed plugin version as a directory tree with a
//! `plugin.toml` manifest at its root, grouped into a system scope and one
//! scope per tenant namespace.

pub mod archive;
pub mod hub;
pub mod manifest;
pub mod version;

pub use hub::{Hub, SYSTEM_SCOPE};
pub use manifest::{parse_manifest, read_manifest, MANIFEST_FILE};
