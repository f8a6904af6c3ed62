// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Cloudway integration tests.
//!
//! Provides in-memory collaborators and fixtures for fast, deterministic
//! tests without a container engine or database.
//!
//! # Components
//!
//! - [`MockRuntime`] - container runtime with state tracking and failure injection
//! - [`MockProxy`] - proxy that records routing signals
//! - [`MockScm`] - source control with a fixed branch list
//! - [`MemoryRecordStore`] - in-memory application records
//! - [`HubFixture`] - temp-dir hub with generated plugins
//! - [`BrokerHarness`] - a broker wired to all of the above

pub mod harness;
pub mod hub_fixture;
pub mod mock_proxy;
pub mod mock_runtime;
pub mod mock_scm;
pub mod record_store;

pub use harness::BrokerHarness;
pub use hub_fixture::HubFixture;
pub use mock_proxy::{MockProxy, ProxyCall};
pub use mock_runtime::{ExecCall, MockRuntime, RuntimeOp};
pub use mock_scm::MockScm;
pub use record_store::MemoryRecordStore;
