// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin resolution with namespace ownership and sharing rules.
//!
//! A tag naming a namespace is looked up there only, and a private plugin in
//! another tenant's namespace is indistinguishable from a missing one. A tag
//! without a namespace is looked up in the caller's namespace first, then in
//! system scope.

use std::collections::HashMap;
use std::sync::Arc;

use cloudway_core::{Category, CloudwayError, Plugin, PluginTag};
use cloudway_hub::Hub;
use tracing::debug;

/// Resolves plugin tags against a [`Hub`] on behalf of a caller namespace.
#[derive(Clone)]
pub struct Resolver {
    hub: Arc<Hub>,
}

impl Resolver {
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Plugins visible to the caller: system plugins overlaid by the caller's
    /// own plugins of the same name, sorted by display name.
    pub fn installed_plugins(
        &self,
        namespace: &str,
        category: Option<Category>,
    ) -> Result<Vec<Plugin>, CloudwayError> {
        let mut merged: HashMap<String, Plugin> = HashMap::new();

        for plugin in self.hub.list_plugins("", category)? {
            merged.insert(plugin.name.clone(), plugin);
        }
        if !namespace.is_empty() {
            for plugin in self.hub.list_plugins(namespace, category)? {
                merged.insert(plugin.name.clone(), plugin);
            }
        }

        let mut plugins: Vec<Plugin> = merged.into_values().collect();
        sort_by_display_name(&mut plugins);
        Ok(plugins)
    }

    /// Plugins installed in the caller's own namespace, sorted by display
    /// name. Empty for callers without a namespace.
    pub fn user_plugins(
        &self,
        namespace: &str,
        category: Option<Category>,
    ) -> Result<Vec<Plugin>, CloudwayError> {
        if namespace.is_empty() {
            return Ok(Vec::new());
        }
        let mut plugins = self.hub.list_plugins(namespace, category)?;
        sort_by_display_name(&mut plugins);
        Ok(plugins)
    }

    /// Resolves `tag` for a caller in `namespace`. The service role, if any,
    /// is ignored.
    pub fn resolve(&self, namespace: &str, tag: &PluginTag) -> Result<Plugin, CloudwayError> {
        let tag = tag.clean();

        if !tag.namespace.is_empty() {
            let foreign = tag.namespace != namespace;
            let hidden = || CloudwayError::PluginNotFound {
                tag: tag.to_string(),
            };
            return match self.hub.plugin_info(&tag) {
                Ok(plugin) if foreign && !plugin.shared => {
                    debug!(tag = %tag, caller = namespace, "private plugin hidden from caller");
                    Err(hidden())
                }
                Ok(plugin) => Ok(plugin),
                Err(e) if foreign && e.is_not_found() => Err(hidden()),
                Err(e) => Err(e),
            };
        }

        let mut own_miss = None;
        if !namespace.is_empty() {
            match self.hub.plugin_info(&tag.in_namespace(namespace)) {
                Ok(plugin) => return Ok(plugin),
                Err(e @ CloudwayError::Storage { .. }) => return Err(e),
                Err(e) => {
                    debug!(tag = %tag, caller = namespace, error = %e, "falling back to system scope");
                    own_miss = Some(e);
                }
            }
        }

        match self.hub.plugin_info(&tag) {
            Ok(plugin) => Ok(plugin),
            // The caller has the plugin but not this version: say so.
            Err(CloudwayError::PluginNotFound { .. })
                if matches!(own_miss, Some(CloudwayError::VersionNotFound { .. })) =>
            {
                Err(own_miss.unwrap_or(CloudwayError::PluginNotFound {
                    tag: tag.to_string(),
                }))
            }
            Err(e) => Err(e),
        }
    }

    /// Parses and resolves a tag string.
    pub fn resolve_str(&self, namespace: &str, tag: &str) -> Result<Plugin, CloudwayError> {
        self.resolve(namespace, &PluginTag::parse(tag)?)
    }
}

fn sort_by_display_name(plugins: &mut [Plugin]) {
    plugins.sort_by(|a, b| {
        a.display_name
            .cmp(&b.display_name)
            .then_with(|| a.name.cmp(&b.name))
    });
}
