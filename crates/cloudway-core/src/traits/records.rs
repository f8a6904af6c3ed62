// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable application metadata contract.

use async_trait::async_trait;

use crate::error::CloudwayError;
use crate::types::ApplicationRecord;

/// Stores which applications exist per namespace, with their plugin tags and
/// scaling factor. Must survive process restarts.
#[async_trait]
pub trait UserRecordStore: Send + Sync {
    async fn get_application(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ApplicationRecord>, CloudwayError>;

    /// Lists a namespace's applications ordered by name.
    async fn list_applications(
        &self,
        namespace: &str,
    ) -> Result<Vec<ApplicationRecord>, CloudwayError>;

    /// Inserts or replaces the record with the same name.
    async fn put_application(
        &self,
        namespace: &str,
        record: &ApplicationRecord,
    ) -> Result<(), CloudwayError>;

    /// Deletes a record. Returns whether a record existed.
    async fn remove_application(&self, namespace: &str, name: &str)
        -> Result<bool, CloudwayError>;
}
