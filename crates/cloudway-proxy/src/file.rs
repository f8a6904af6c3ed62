// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route table persisted as JSON (`file:///path/to/routes.json`).
//!
//! The whole table is rewritten on every change through a temp file in the
//! same directory followed by a rename, so readers never observe a partial
//! file.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cloudway_core::{CloudwayError, Endpoint, Proxy};
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::registry::ProxyBackend;

type RouteTable = BTreeMap<String, Vec<Endpoint>>;

/// Backend for `file://` URLs.
pub struct FileBackend;

impl ProxyBackend for FileBackend {
    fn scheme(&self) -> &str {
        "file"
    }

    fn connect(&self, url: &Url) -> Result<Arc<dyn Proxy>, CloudwayError> {
        let path = url
            .to_file_path()
            .map_err(|()| CloudwayError::Config(format!("proxy URL `{url}` is not a file path")))?;
        Ok(Arc::new(FileProxy::open(path)?))
    }
}

/// Route table mirrored to a JSON file.
pub struct FileProxy {
    path: PathBuf,
    routes: Mutex<RouteTable>,
}

impl FileProxy {
    /// Loads the table at `path`; a missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CloudwayError> {
        let path = path.into();
        let routes = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| CloudwayError::Proxy {
                message: format!("corrupt route table {}", path.display()),
                source: Some(Box::new(e)),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RouteTable::new(),
            Err(e) => return Err(CloudwayError::io(e)),
        };
        Ok(Self {
            path,
            routes: Mutex::new(routes),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the in-memory table.
    pub async fn routes(&self) -> RouteTable {
        self.routes.lock().await.clone()
    }

    /// Applies `change` and persists the result while holding the table lock.
    async fn update<F>(&self, change: F) -> Result<(), CloudwayError>
    where
        F: FnOnce(&mut RouteTable),
    {
        let mut routes = self.routes.lock().await;
        let mut next = routes.clone();
        change(&mut next);

        let json = serde_json::to_vec_pretty(&next).map_err(|e| CloudwayError::Proxy {
            message: "cannot encode route table".to_string(),
            source: Some(Box::new(e)),
        })?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &json))
            .await
            .map_err(|e| CloudwayError::Internal(format!("route table write failed: {e}")))??;

        *routes = next;
        Ok(())
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<(), CloudwayError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(CloudwayError::io)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(CloudwayError::io)?;
    tmp.write_all(data).map_err(CloudwayError::io)?;
    tmp.as_file().sync_all().map_err(CloudwayError::io)?;
    tmp.persist(path).map_err(|e| CloudwayError::io(e.error))?;
    Ok(())
}

#[async_trait]
impl Proxy for FileProxy {
    async fn add_endpoints(&self, id: &str, endpoints: &[Endpoint]) -> Result<(), CloudwayError> {
        self.update(|routes| {
            let entry = routes.entry(id.to_string()).or_default();
            for endpoint in endpoints {
                if !entry.contains(endpoint) {
                    entry.push(endpoint.clone());
                }
            }
        })
        .await?;
        debug!(container = id, path = %self.path.display(), "routes added");
        Ok(())
    }

    async fn remove_endpoints(&self, id: &str) -> Result<(), CloudwayError> {
        self.update(|routes| {
            routes.remove(id);
        })
        .await
    }

    async fn reset(&self) -> Result<(), CloudwayError> {
        self.update(RouteTable::clear).await
    }

    async fn close(&self) -> Result<(), CloudwayError> {
        Ok(())
    }
}
