// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Source-control deployment contract.

use async_trait::async_trait;

use crate::error::CloudwayError;
use crate::types::Branch;

/// Deploys application source. Opaque to the broker.
#[async_trait]
pub trait Scm: Send + Sync {
    async fn deploy(&self, namespace: &str, app: &str, branch: &str) -> Result<(), CloudwayError>;

    /// The branch currently deployed.
    async fn deployment_branch(&self, namespace: &str, app: &str)
        -> Result<Branch, CloudwayError>;

    /// Every branch available for deployment.
    async fn deployment_branches(
        &self,
        namespace: &str,
        app: &str,
    ) -> Result<Vec<Branch>, CloudwayError>;
}
