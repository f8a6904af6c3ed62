// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock proxy that records every routing signal.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use cloudway_core::{CloudwayError, Endpoint, Proxy};

/// A routing signal received by [`MockProxy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyCall {
    Add(String),
    Remove(String),
    Reset,
}

/// Captures proxy calls and keeps the resulting route table.
///
/// With [`MockProxy::set_failing`] every call is still recorded but returns
/// an error and leaves the table untouched.
#[derive(Default)]
pub struct MockProxy {
    calls: Mutex<Vec<ProxyCall>>,
    routes: Mutex<BTreeMap<String, Vec<Endpoint>>>,
    failing: AtomicBool,
}

impl MockProxy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> Vec<ProxyCall> {
        self.calls.lock().await.clone()
    }

    /// Container ids that currently have routes.
    pub async fn routed(&self) -> Vec<String> {
        self.routes.lock().await.keys().cloned().collect()
    }

    async fn record(&self, call: ProxyCall) -> Result<(), CloudwayError> {
        self.calls.lock().await.push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CloudwayError::Proxy {
                message: "injected failure".to_string(),
                source: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Proxy for MockProxy {
    async fn add_endpoints(&self, id: &str, endpoints: &[Endpoint]) -> Result<(), CloudwayError> {
        self.record(ProxyCall::Add(id.to_string())).await?;
        self.routes
            .lock()
            .await
            .insert(id.to_string(), endpoints.to_vec());
        Ok(())
    }

    async fn remove_endpoints(&self, id: &str) -> Result<(), CloudwayError> {
        self.record(ProxyCall::Remove(id.to_string())).await?;
        self.routes.lock().await.remove(id);
        Ok(())
    }

    async fn reset(&self) -> Result<(), CloudwayError> {
        self.record(ProxyCall::Reset).await?;
        self.routes.lock().await.clear();
        Ok(())
    }

    async fn close(&self) -> Result<(), CloudwayError> {
        Ok(())
    }
}
