// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing backend contract.

use async_trait::async_trait;

use crate::error::CloudwayError;
use crate::types::Endpoint;

/// Publishes container endpoints to the routing layer.
///
/// Routing is eventually consistent with runtime state: the broker treats
/// every call as a best-effort signal.
#[async_trait]
pub trait Proxy: Send + Sync {
    /// Adds the endpoints associated with a container.
    async fn add_endpoints(&self, id: &str, endpoints: &[Endpoint]) -> Result<(), CloudwayError>;

    /// Removes every endpoint associated with a container.
    async fn remove_endpoints(&self, id: &str) -> Result<(), CloudwayError>;

    /// Clears all routes, used before a full resync.
    async fn reset(&self) -> Result<(), CloudwayError>;

    /// Closes the connection to the backend.
    async fn close(&self) -> Result<(), CloudwayError>;
}
