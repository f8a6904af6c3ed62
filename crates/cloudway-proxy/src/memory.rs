// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process route table (`memory://`).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use cloudway_core::{CloudwayError, Endpoint, Proxy};
use dashmap::DashMap;
use tracing::debug;
use url::Url;

use crate::registry::ProxyBackend;

/// Backend for `memory://`. Every connect yields an independent table.
pub struct MemoryBackend;

impl ProxyBackend for MemoryBackend {
    fn scheme(&self) -> &str {
        "memory"
    }

    fn connect(&self, _url: &Url) -> Result<Arc<dyn Proxy>, CloudwayError> {
        Ok(Arc::new(MemoryProxy::new()))
    }
}

/// Route table kept in memory, keyed by container id.
#[derive(Default)]
pub struct MemoryProxy {
    routes: DashMap<String, Vec<Endpoint>>,
    closed: AtomicBool,
}

impl MemoryProxy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current routes, ordered by container id.
    pub fn routes(&self) -> BTreeMap<String, Vec<Endpoint>> {
        self.routes
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    pub fn endpoints(&self, id: &str) -> Vec<Endpoint> {
        self.routes
            .get(id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check_open(&self) -> Result<(), CloudwayError> {
        if self.is_closed() {
            return Err(CloudwayError::Proxy {
                message: "proxy is closed".to_string(),
                source: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Proxy for MemoryProxy {
    async fn add_endpoints(&self, id: &str, endpoints: &[Endpoint]) -> Result<(), CloudwayError> {
        self.check_open()?;
        let mut entry = self.routes.entry(id.to_string()).or_default();
        for endpoint in endpoints {
            if !entry.contains(endpoint) {
                entry.push(endpoint.clone());
            }
        }
        debug!(container = id, count = endpoints.len(), "routes added");
        Ok(())
    }

    async fn remove_endpoints(&self, id: &str) -> Result<(), CloudwayError> {
        self.check_open()?;
        self.routes.remove(id);
        debug!(container = id, "routes removed");
        Ok(())
    }

    async fn reset(&self) -> Result<(), CloudwayError> {
        self.check_open()?;
        self.routes.clear();
        Ok(())
    }

    async fn close(&self) -> Result<(), CloudwayError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(port: u16) -> Endpoint {
        Endpoint {
            private_port: port,
            protocol: "http".to_string(),
            frontend: String::new(),
        }
    }

    #[tokio::test]
    async fn add_is_deduplicated_and_remove_drops_container() {
        let proxy = MemoryProxy::new();
        proxy.add_endpoints("c1", &[http(8080)]).await.unwrap();
        proxy.add_endpoints("c1", &[http(8080), http(9000)]).await.unwrap();
        proxy.add_endpoints("c2", &[http(3306)]).await.unwrap();
        assert_eq!(proxy.endpoints("c1").len(), 2);

        proxy.remove_endpoints("c1").await.unwrap();
        assert!(proxy.endpoints("c1").is_empty());
        assert_eq!(proxy.routes().len(), 1);

        // Removing unknown containers is not an error.
        proxy.remove_endpoints("ghost").await.unwrap();
    }

    #[tokio::test]
    async fn reset_and_close() {
        let proxy = MemoryProxy::new();
        proxy.add_endpoints("c1", &[http(8080)]).await.unwrap();
        proxy.reset().await.unwrap();
        assert!(proxy.routes().is_empty());

        proxy.close().await.unwrap();
        assert!(proxy.is_closed());
        assert!(proxy.add_endpoints("c1", &[http(1)]).await.is_err());
    }
}
