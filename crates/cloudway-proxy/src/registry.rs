// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheme-keyed registry of routing backends.
//!
//! The backend table is fixed at construction. Opening a proxy URL picks the
//! backend registered for its scheme and asks it to connect.

use std::collections::HashMap;
use std::sync::Arc;

use cloudway_core::{CloudwayError, Proxy};
use tracing::info;
use url::Url;

use crate::file::FileBackend;
use crate::memory::MemoryBackend;

/// Factory for one proxy URL scheme.
pub trait ProxyBackend: Send + Sync {
    /// URL scheme this backend serves, without the `://`.
    fn scheme(&self) -> &str;

    /// Opens a proxy for `url`, whose scheme matches [`ProxyBackend::scheme`].
    fn connect(&self, url: &Url) -> Result<Arc<dyn Proxy>, CloudwayError>;
}

/// Immutable scheme → backend table.
pub struct ProxyRegistry {
    backends: HashMap<String, Box<dyn ProxyBackend>>,
}

impl ProxyRegistry {
    /// Builds a registry. A later backend replaces an earlier one with the
    /// same scheme.
    pub fn new(backends: Vec<Box<dyn ProxyBackend>>) -> Self {
        let backends = backends
            .into_iter()
            .map(|b| (b.scheme().to_string(), b))
            .collect();
        Self { backends }
    }

    /// Registry with the `memory` and `file` backends.
    pub fn with_builtin_backends() -> Self {
        Self::new(vec![Box::new(MemoryBackend), Box::new(FileBackend)])
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Opens the proxy named by `proxy_url`.
    pub fn open(&self, proxy_url: &str) -> Result<Arc<dyn Proxy>, CloudwayError> {
        let proxy_url = proxy_url.trim();
        if proxy_url.is_empty() {
            return Err(CloudwayError::ProxyNotConfigured);
        }

        let url = Url::parse(proxy_url)
            .map_err(|e| CloudwayError::Config(format!("invalid proxy URL `{proxy_url}`: {e}")))?;

        let backend = self
            .backends
            .get(url.scheme())
            .ok_or_else(|| CloudwayError::UnsupportedScheme {
                scheme: url.scheme().to_string(),
            })?;

        let proxy = backend.connect(&url)?;
        info!(scheme = url.scheme(), "proxy opened");
        Ok(proxy)
    }
}

impl Default for ProxyRegistry {
    fn default() -> Self {
        Self::with_builtin_backends()
    }
}
