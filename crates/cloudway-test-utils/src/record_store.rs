// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory application record store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use cloudway_core::{ApplicationRecord, CloudwayError, UserRecordStore};

/// `UserRecordStore` over a `BTreeMap` keyed by `(namespace, name)`.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<BTreeMap<(String, String), ApplicationRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl UserRecordStore for MemoryRecordStore {
    async fn get_application(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ApplicationRecord>, CloudwayError> {
        let records = self.records.lock().await;
        Ok(records
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn list_applications(
        &self,
        namespace: &str,
    ) -> Result<Vec<ApplicationRecord>, CloudwayError> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn put_application(
        &self,
        namespace: &str,
        record: &ApplicationRecord,
    ) -> Result<(), CloudwayError> {
        self.records
            .lock()
            .await
            .insert((namespace.to_string(), record.name.clone()), record.clone());
        Ok(())
    }

    async fn remove_application(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<bool, CloudwayError> {
        Ok(self
            .records
            .lock()
            .await
            .remove(&(namespace.to_string(), name.to_string()))
            .is_some())
    }
}
