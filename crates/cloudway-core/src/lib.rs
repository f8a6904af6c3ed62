// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Cloudway control plane.
//!
//! This crate provides the error taxonomy, the plugin tag grammar, the shared
//! data model, and the collaborator traits (container runtime, record store,
//! proxy, SCM) that the hub and broker are written against.

pub mod error;
pub mod sync;
pub mod tag;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{CloudwayError, ErrorKind};
pub use sync::KeyedLocks;
pub use tag::PluginTag;
pub use types::{
    ApplicationRecord, Branch, Category, ContainerHandle, CreateContainers, Endpoint, Identity,
    Plugin, ResolvedPlugin, ServiceFilter, Transition,
};

pub use traits::{ContainerRuntime, Proxy, Scm, UserRecordStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_collaborator_traits_are_object_safe() {
        fn _runtime(_: &dyn ContainerRuntime) {}
        fn _records(_: &dyn UserRecordStore) {}
        fn _proxy(_: &dyn Proxy) {}
        fn _scm(_: &dyn Scm) {}
    }
}
