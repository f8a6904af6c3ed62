// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator contracts consumed by the broker.
//!
//! All collaborators use `#[async_trait]` so they can be held as trait objects.

pub mod proxy;
pub mod records;
pub mod runtime;
pub mod scm;

pub use proxy::Proxy;
pub use records::UserRecordStore;
pub use runtime::ContainerRuntime;
pub use scm::Scm;
