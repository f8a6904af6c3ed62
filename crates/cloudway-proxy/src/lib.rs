// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing backends for application endpoints.
//!
//! A [`ProxyRegistry`] maps URL schemes to [`ProxyBackend`] factories. The
//! broker only sees the resulting `cloudway_core::Proxy` trait object.

pub mod file;
pub mod memory;
pub mod registry;

pub use file::{FileBackend, FileProxy};
pub use memory::{MemoryBackend, MemoryProxy};
pub use registry::{ProxyBackend, ProxyRegistry};
