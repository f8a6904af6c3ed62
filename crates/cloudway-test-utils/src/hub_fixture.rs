// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A throwaway plugin hub populated from generated manifests.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use cloudway_core::{Category, CloudwayError, Plugin};
use cloudway_hub::Hub;

/// A hub rooted in a temp directory that lives as long as the fixture.
pub struct HubFixture {
    dir: TempDir,
    hub: Arc<Hub>,
    sources: usize,
}

impl HubFixture {
    pub fn new() -> Result<Self, CloudwayError> {
        let dir = TempDir::new().map_err(CloudwayError::io)?;
        let hub = Arc::new(Hub::open(dir.path().join("hub"))?);
        Ok(Self {
            dir,
            hub,
            sources: 0,
        })
    }

    pub fn hub(&self) -> Arc<Hub> {
        self.hub.clone()
    }

    /// Writes a plugin source directory without installing it.
    pub fn write_source(
        &mut self,
        name: &str,
        version: &str,
        category: Category,
        shared: bool,
    ) -> Result<PathBuf, CloudwayError> {
        self.sources += 1;
        let src = self.dir.path().join(format!("src-{}", self.sources));
        std::fs::create_dir_all(&src).map_err(CloudwayError::io)?;

        let port = if category.is_framework() { 8080 } else { 3306 };
        let manifest = format!(
            "[plugin]\n\
             name = \"{name}\"\n\
             display_name = \"{display}\"\n\
             version = \"{version}\"\n\
             category = \"{category}\"\n\
             shared = {shared}\n\n\
             [[endpoints]]\n\
             private_port = {port}\n",
            display = display_name(name, version),
        );
        std::fs::write(src.join("plugin.toml"), manifest).map_err(CloudwayError::io)?;
        Ok(src)
    }

    /// Generates and installs a plugin into `namespace` (empty for system).
    pub async fn install(
        &mut self,
        namespace: &str,
        name: &str,
        version: &str,
        category: Category,
        shared: bool,
    ) -> Result<Plugin, CloudwayError> {
        let src = self.write_source(name, version, category, shared)?;
        self.hub.install_plugin(namespace, &src).await
    }

    pub async fn framework(
        &mut self,
        namespace: &str,
        name: &str,
        version: &str,
    ) -> Result<Plugin, CloudwayError> {
        self.install(namespace, name, version, Category::Framework, false)
            .await
    }

    pub async fn service(
        &mut self,
        namespace: &str,
        name: &str,
        version: &str,
    ) -> Result<Plugin, CloudwayError> {
        self.install(namespace, name, version, Category::Service, false)
            .await
    }
}

/// `php` + `7.0` → `Php 7.0`.
fn display_name(name: &str, version: &str) -> String {
    let mut chars = name.chars();
    let head: String = chars.next().map(|c| c.to_uppercase().collect()).unwrap_or_default();
    format!("{head}{} {version}", chars.as_str())
}
