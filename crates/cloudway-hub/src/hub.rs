// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The on-disk plugin repository.
//!
//! Layout: `<root>/<scope>/<name>/<version>/plugin.toml`, where `scope` is
//! [`SYSTEM_SCOPE`] for platform plugins or a tenant namespace. Installs are
//! staged under `<root>/.staging` and swapped into place with a rename.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use cloudway_core::{Category, CloudwayError, KeyedLocks, Plugin, PluginTag};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::archive;
use crate::manifest;
use crate::version;

/// Scope directory holding system plugins.
pub const SYSTEM_SCOPE: &str = ".cloudway";

/// Scratch area for in-flight installs, on the same filesystem as the tree.
const STAGING_DIR: &str = ".staging";

/// Tenant namespaces cannot start with a dot, so they never collide with
/// [`SYSTEM_SCOPE`] or the staging area.
static NAMESPACE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_-]*$").unwrap());

/// Versioned plugin storage rooted at one directory.
pub struct Hub {
    root: PathBuf,
    /// Serializes installs and removals per `(scope, name)`.
    locks: KeyedLocks<(String, String)>,
}

impl Hub {
    /// Opens the repository at `root`, creating it if missing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CloudwayError> {
        let root = root.into();
        std::fs::create_dir_all(root.join(SYSTEM_SCOPE)).map_err(CloudwayError::io)?;
        std::fs::create_dir_all(root.join(STAGING_DIR)).map_err(CloudwayError::io)?;
        Ok(Self {
            root,
            locks: KeyedLocks::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory name of a namespace's scope.
    fn scope(namespace: &str) -> Result<&str, CloudwayError> {
        if namespace.is_empty() {
            Ok(SYSTEM_SCOPE)
        } else if NAMESPACE_PATTERN.is_match(namespace) {
            Ok(namespace)
        } else {
            Err(CloudwayError::Validation(format!(
                "invalid namespace `{namespace}`"
            )))
        }
    }

    fn base_dir(&self, namespace: &str, name: &str) -> Result<PathBuf, CloudwayError> {
        if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
            return Err(CloudwayError::Validation(format!(
                "invalid plugin name `{name}`"
            )));
        }
        Ok(self.root.join(Self::scope(namespace)?).join(name))
    }

    /// Installed versions of a plugin, ascending. Empty when none.
    pub fn versions(&self, namespace: &str, name: &str) -> Result<Vec<String>, CloudwayError> {
        let base = self.base_dir(namespace, name)?;
        let mut versions = list_subdirs(&base)?;
        version::sort(&mut versions);
        Ok(versions)
    }

    /// Resolves a tag to its install directory within the tag's own scope.
    ///
    /// An empty version selects the latest installed version.
    pub fn plugin_path(&self, tag: &PluginTag) -> Result<PathBuf, CloudwayError> {
        let versions = self.versions(&tag.namespace, &tag.name)?;
        let bare = PluginTag {
            version: String::new(),
            ..tag.clean()
        };

        let selected = if tag.version.is_empty() {
            version::latest(versions.iter().map(String::as_str))
        } else {
            versions
                .iter()
                .map(String::as_str)
                .find(|v| *v == tag.version)
        };

        match selected {
            Some(v) => {
                debug!(tag = %tag, version = v, "resolved plugin path");
                Ok(self.base_dir(&tag.namespace, &tag.name)?.join(v))
            }
            None if versions.is_empty() => Err(CloudwayError::PluginNotFound {
                tag: bare.to_string(),
            }),
            None => Err(CloudwayError::VersionNotFound {
                tag: bare.to_string(),
                version: tag.version.clone(),
            }),
        }
    }

    /// Reads the manifest of the installation a tag resolves to.
    pub fn plugin_info(&self, tag: &PluginTag) -> Result<Plugin, CloudwayError> {
        let path = self.plugin_path(tag)?;
        let mut plugin = manifest::read_manifest(&path)?;
        plugin.namespace = tag.namespace.clone();
        plugin.path = Some(path);
        Ok(plugin)
    }

    /// Installs a plugin from a directory or a tar(.gz) archive.
    ///
    /// An existing installation of the same name and version is replaced
    /// wholesale. An empty namespace installs into system scope.
    pub async fn install_plugin(
        &self,
        namespace: &str,
        source: &Path,
    ) -> Result<Plugin, CloudwayError> {
        let scope = Self::scope(namespace)?.to_string();
        if !source.exists() {
            return Err(CloudwayError::Validation(format!(
                "plugin source not found: {}",
                source.display()
            )));
        }

        let staging_root = self.root.join(STAGING_DIR);
        let source_path = source.to_path_buf();
        let (staging, plugin) = tokio::task::spawn_blocking(move || stage(&staging_root, &source_path))
            .await
            .map_err(|e| CloudwayError::Internal(format!("install task failed: {e}")))??;

        let _guard = self
            .locks
            .lock((scope.clone(), plugin.name.clone()))
            .await;

        let target = self.base_dir(namespace, &plugin.name)?.join(&plugin.version);
        let staged = staging.path().join(STAGED_PAYLOAD);
        let aside = staging.path().join(REPLACED_PAYLOAD);
        let dest = target.clone();
        tokio::task::spawn_blocking(move || swap_in(&staged, &dest, &aside))
            .await
            .map_err(|e| CloudwayError::Internal(format!("install task failed: {e}")))??;
        drop(staging);

        info!(
            scope = %scope,
            plugin = %plugin.name,
            version = %plugin.version,
            "plugin installed"
        );

        Ok(Plugin {
            namespace: namespace.to_string(),
            path: Some(target),
            ..plugin
        })
    }

    /// Removes one version, or every version when the tag has none.
    pub async fn remove_plugin(&self, namespace: &str, tag: &PluginTag) -> Result<(), CloudwayError> {
        let scope = Self::scope(namespace)?.to_string();
        let scoped = tag.clean().in_namespace(namespace);

        let _guard = self.locks.lock((scope.clone(), tag.name.clone())).await;

        let base = self.base_dir(namespace, &tag.name)?;
        let target = if tag.version.is_empty() {
            if self.versions(namespace, &tag.name)?.is_empty() {
                return Err(CloudwayError::PluginNotFound {
                    tag: scoped.to_string(),
                });
            }
            base.clone()
        } else {
            // Exact version only; reports PluginNotFound or VersionNotFound.
            self.plugin_path(&scoped)?
        };

        let cleanup_base = base.clone();
        tokio::task::spawn_blocking(move || -> Result<(), CloudwayError> {
            std::fs::remove_dir_all(&target).map_err(CloudwayError::io)?;
            if cleanup_base.exists() && list_subdirs(&cleanup_base)?.is_empty() {
                std::fs::remove_dir_all(&cleanup_base).map_err(CloudwayError::io)?;
            }
            Ok(())
        })
        .await
        .map_err(|e| CloudwayError::Internal(format!("remove task failed: {e}")))??;

        info!(scope = %scope, tag = %scoped, "plugin removed");
        Ok(())
    }

    /// Lists one entry per plugin name in a scope, at its latest version.
    ///
    /// Missing scopes, and namespaces the hub cannot hold, yield an empty
    /// list. Plugins with unreadable manifests are skipped.
    pub fn list_plugins(
        &self,
        namespace: &str,
        category: Option<Category>,
    ) -> Result<Vec<Plugin>, CloudwayError> {
        let Ok(scope) = Self::scope(namespace) else {
            debug!(namespace, "namespace has no hub scope");
            return Ok(Vec::new());
        };
        let scope_dir = self.root.join(scope);
        let mut latest: HashMap<String, Plugin> = HashMap::new();

        for name in list_subdirs(&scope_dir)? {
            let tag = PluginTag {
                namespace: namespace.to_string(),
                name: name.clone(),
                ..PluginTag::default()
            };
            match self.plugin_info(&tag) {
                Ok(plugin) => {
                    if category.is_none_or(|c| c == plugin.category) {
                        latest.insert(name, plugin);
                    }
                }
                Err(e) => {
                    warn!(scope = %scope_dir.display(), plugin = %name, error = %e, "skipping unreadable plugin");
                }
            }
        }

        Ok(latest.into_values().collect())
    }
}

/// Name of the staged tree inside a staging temp dir.
const STAGED_PAYLOAD: &str = "payload";

/// Where a replaced installation waits inside the staging temp dir.
const REPLACED_PAYLOAD: &str = "replaced";

/// Copies or extracts `source` into a fresh staging dir and reads its manifest.
fn stage(staging_root: &Path, source: &Path) -> Result<(tempfile::TempDir, Plugin), CloudwayError> {
    let staging = tempfile::Builder::new()
        .prefix("install-")
        .tempdir_in(staging_root)
        .map_err(CloudwayError::io)?;
    let payload = staging.path().join(STAGED_PAYLOAD);
    std::fs::create_dir(&payload).map_err(CloudwayError::io)?;

    if source.is_dir() {
        archive::copy_dir(source, &payload)?;
    } else {
        archive::extract_archive(source, &payload)?;
    }

    let plugin = manifest::read_manifest(&payload)?;
    Ok((staging, plugin))
}

/// Replaces `target` with `staged`, never merging the two trees.
///
/// The old tree is renamed to `aside` first and restored if the new tree
/// cannot be moved in.
fn swap_in(staged: &Path, target: &Path, aside: &Path) -> Result<(), CloudwayError> {
    let replaced = target.exists();
    if replaced {
        std::fs::rename(target, aside).map_err(CloudwayError::io)?;
    } else if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(CloudwayError::io)?;
    }

    if let Err(e) = std::fs::rename(staged, target) {
        if replaced && let Err(restore) = std::fs::rename(aside, target) {
            warn!(target = %target.display(), error = %restore, "failed to restore replaced plugin");
        }
        return Err(CloudwayError::io(e));
    }

    if replaced {
        std::fs::remove_dir_all(aside).map_err(CloudwayError::io)?;
    }
    Ok(())
}

/// Visible subdirectory names of `dir`. A missing directory has none.
fn list_subdirs(dir: &Path) -> Result<Vec<String>, CloudwayError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(CloudwayError::io(e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(CloudwayError::io)?;
        if !entry.file_type().map_err(CloudwayError::io)?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str()
            && !name.starts_with('.')
        {
            names.push(name.to_string());
        }
    }
    Ok(names)
}
