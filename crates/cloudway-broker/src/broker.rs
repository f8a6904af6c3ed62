// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application lifecycle orchestration.
//!
//! [`Broker`] owns the collaborators; [`UserBroker`] scopes every operation to
//! one caller. Mutating operations on the same `(namespace, application)` are
//! serialized for their whole duration, while different applications never
//! contend.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, LazyLock};

use chrono::Utc;
use regex::Regex;
use tracing::{debug, info, warn};

use cloudway_core::{
    ApplicationRecord, Category, CloudwayError, ContainerHandle, ContainerRuntime,
    CreateContainers, Identity, KeyedLocks, Plugin, PluginTag, Proxy, ResolvedPlugin, Scm,
    ServiceFilter, Transition, UserRecordStore,
};
use cloudway_core::sync::KeyedGuard;
use cloudway_hub::Hub;

use crate::info::{ApplicationInfo, BrokerSettings, Deployments};
use crate::resolver::Resolver;
use crate::scale::ScaleRequest;

static APP_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z_0-9]*$").unwrap());

static ENV_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_0-9]+$").unwrap());

/// Helper run inside containers to edit the application environment.
const SETENV_COMMAND: &str = "/usr/bin/cwctl";

/// Request to create an application.
#[derive(Debug, Clone)]
pub struct CreateApplication {
    pub name: String,
    /// Framework plugin tag.
    pub framework: String,
    /// Service plugin tags.
    pub services: Vec<String>,
    /// Initial framework replica count.
    pub scaling: u32,
}

impl CreateApplication {
    pub fn new(name: impl Into<String>, framework: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            framework: framework.into(),
            services: Vec::new(),
            scaling: 1,
        }
    }

    pub fn with_service(mut self, tag: impl Into<String>) -> Self {
        self.services.push(tag.into());
        self
    }

    pub fn with_scaling(mut self, scaling: u32) -> Self {
        self.scaling = scaling;
        self
    }
}

/// The lifecycle broker shared by all callers.
pub struct Broker {
    hub: Arc<Hub>,
    resolver: Resolver,
    runtime: Arc<dyn ContainerRuntime>,
    records: Arc<dyn UserRecordStore>,
    proxy: Arc<dyn Proxy>,
    scm: Option<Arc<dyn Scm>>,
    settings: BrokerSettings,
    locks: KeyedLocks<(String, String)>,
}

impl Broker {
    pub fn new(
        hub: Arc<Hub>,
        runtime: Arc<dyn ContainerRuntime>,
        records: Arc<dyn UserRecordStore>,
        proxy: Arc<dyn Proxy>,
    ) -> Self {
        Self {
            resolver: Resolver::new(hub.clone()),
            hub,
            runtime,
            records,
            proxy,
            scm: None,
            settings: BrokerSettings::default(),
            locks: KeyedLocks::new(),
        }
    }

    pub fn with_scm(mut self, scm: Arc<dyn Scm>) -> Self {
        self.scm = Some(scm);
        self
    }

    pub fn with_settings(mut self, settings: BrokerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    /// Applications with an operation in flight or waiting.
    pub fn busy_applications(&self) -> usize {
        self.locks.len()
    }

    /// Scopes operations to `user`.
    pub fn for_user(&self, user: Identity) -> UserBroker<'_> {
        UserBroker { broker: self, user }
    }
}

/// Broker operations on behalf of one caller.
pub struct UserBroker<'a> {
    broker: &'a Broker,
    user: Identity,
}

impl UserBroker<'_> {
    pub fn user(&self) -> &Identity {
        &self.user
    }

    fn namespace(&self) -> Result<&str, CloudwayError> {
        if self.user.namespace.is_empty() {
            return Err(CloudwayError::NoNamespace {
                user: self.user.username.clone(),
            });
        }
        Ok(&self.user.namespace)
    }

    async fn lock(&self, namespace: &str, name: &str) -> KeyedGuard<'_, (String, String)> {
        self.broker
            .locks
            .lock((namespace.to_string(), name.to_string()))
            .await
    }

    async fn find(
        &self,
        namespace: &str,
        name: &str,
        filter: &ServiceFilter,
    ) -> Result<Vec<ContainerHandle>, CloudwayError> {
        self.broker
            .runtime
            .find_containers(name, namespace, filter)
            .await
    }

    /// Live containers matching `filter`, failing when the application has
    /// neither a record nor any container.
    async fn existing(
        &self,
        namespace: &str,
        name: &str,
        filter: &ServiceFilter,
    ) -> Result<Vec<ContainerHandle>, CloudwayError> {
        let containers = self.find(namespace, name, filter).await?;
        if containers.is_empty()
            && self.find(namespace, name, &ServiceFilter::All).await?.is_empty()
            && self.broker.records.get_application(namespace, name).await?.is_none()
        {
            return Err(CloudwayError::ApplicationNotFound {
                name: name.to_string(),
            });
        }
        Ok(containers)
    }

    async fn publish(&self, container: &ContainerHandle) {
        if let Err(e) = self
            .broker
            .proxy
            .add_endpoints(&container.id, &container.endpoints)
            .await
        {
            warn!(container = %container.id, app = %container.app, error = %e, "failed to add proxy endpoints");
        }
    }

    async fn retract(&self, container: &ContainerHandle) {
        if let Err(e) = self.broker.proxy.remove_endpoints(&container.id).await {
            warn!(container = %container.id, app = %container.app, error = %e, "failed to remove proxy endpoints");
        }
    }

    /// Resolves a tag and checks it has the expected category.
    fn resolve_slot(
        &self,
        namespace: &str,
        tag: &str,
        category: Category,
    ) -> Result<ResolvedPlugin, CloudwayError> {
        let tag = PluginTag::parse(tag)?;
        let plugin = self.broker.resolver.resolve(namespace, &tag)?;
        if plugin.category != category {
            return Err(CloudwayError::Validation(format!(
                "`{tag}` is a {} plugin, expected {category}",
                plugin.category
            )));
        }
        Ok(ResolvedPlugin { tag, plugin })
    }

    /// Re-resolves a tag recorded from an earlier resolution. A tag without
    /// a namespace names a system plugin and skips the caller's scope.
    fn resolve_pinned(&self, namespace: &str, tag: &PluginTag) -> Result<Plugin, CloudwayError> {
        if tag.is_system() {
            self.broker.hub.plugin_info(&tag.clean())
        } else {
            self.broker.resolver.resolve(namespace, tag)
        }
    }

    /// Creates the containers of a new application without starting them.
    pub async fn create_application(
        &self,
        request: CreateApplication,
    ) -> Result<Vec<ContainerHandle>, CloudwayError> {
        validate_name(&request.name)?;
        if request.framework.trim().is_empty() {
            return Err(CloudwayError::Validation(
                "the application framework cannot be empty".to_string(),
            ));
        }
        if request.scaling < 1 {
            return Err(CloudwayError::Validation(
                "scaling must be at least 1".to_string(),
            ));
        }
        let ns = self.namespace()?;
        let name = request.name.as_str();

        let _guard = self.lock(ns, name).await;

        if self.broker.records.get_application(ns, name).await?.is_some()
            || !self.find(ns, name, &ServiceFilter::All).await?.is_empty()
        {
            return Err(CloudwayError::ApplicationExists {
                name: name.to_string(),
            });
        }

        let framework = self.resolve_slot(ns, &request.framework, Category::Framework)?;
        let services = request
            .services
            .iter()
            .map(|tag| self.resolve_slot(ns, tag, Category::Service))
            .collect::<Result<Vec<_>, _>>()?;

        let mut plugins = vec![framework.clone()];
        plugins.extend(services);
        let tags: Vec<String> = plugins.iter().map(|p| pinned_tag(p).to_string()).collect();

        let mut containers = self
            .broker
            .runtime
            .create_containers(&CreateContainers {
                app: name.to_string(),
                namespace: ns.to_string(),
                plugins,
                count: 1,
            })
            .await?;

        if request.scaling > 1 {
            let replicas = self
                .broker
                .runtime
                .create_containers(&CreateContainers {
                    app: name.to_string(),
                    namespace: ns.to_string(),
                    plugins: vec![framework],
                    count: request.scaling - 1,
                })
                .await?;
            containers.extend(replicas);
        }

        let record = ApplicationRecord {
            name: name.to_string(),
            plugins: tags,
            scaling: request.scaling,
            created_at: Utc::now(),
        };
        self.broker.records.put_application(ns, &record).await?;

        info!(
            namespace = ns,
            app = name,
            containers = containers.len(),
            "application created"
        );
        Ok(containers)
    }

    /// Starts every container of an application, stopping at the first
    /// failure.
    pub async fn start_application(&self, name: &str) -> Result<(), CloudwayError> {
        let ns = self.namespace()?;
        let _guard = self.lock(ns, name).await;
        let containers = self.existing(ns, name, &ServiceFilter::All).await?;
        self.start_all(&containers).await?;
        info!(namespace = ns, app = name, "application started");
        Ok(())
    }

    /// Starts a given set of containers owned by the caller, for example the
    /// result of a create or scale.
    pub async fn start_containers(&self, containers: &[ContainerHandle]) -> Result<(), CloudwayError> {
        let ns = self.namespace()?;
        if let Some(foreign) = containers.iter().find(|c| c.namespace != ns) {
            return Err(CloudwayError::Validation(format!(
                "container {} does not belong to namespace {ns}",
                foreign.id
            )));
        }

        // Lock in a fixed order so overlapping calls cannot deadlock.
        let apps: BTreeSet<&str> = containers.iter().map(|c| c.app.as_str()).collect();
        let mut guards = Vec::with_capacity(apps.len());
        for app in apps {
            guards.push(self.lock(ns, app).await);
        }
        self.start_all(containers).await
    }

    async fn start_all(&self, containers: &[ContainerHandle]) -> Result<(), CloudwayError> {
        for container in containers {
            let transition = self.broker.runtime.start(container).await?;
            if transition == Transition::Unchanged {
                debug!(container = %container.id, "already running");
            }
            self.publish(container).await;
        }
        Ok(())
    }

    /// Stops every container of an application. Continues past failures and
    /// reports the first one.
    pub async fn stop_application(&self, name: &str) -> Result<(), CloudwayError> {
        let ns = self.namespace()?;
        let _guard = self.lock(ns, name).await;
        let containers = self.existing(ns, name, &ServiceFilter::All).await?;

        let mut first_error = None;
        for container in &containers {
            self.retract(container).await;
            match self.broker.runtime.stop(container).await {
                Ok(Transition::Unchanged) => {
                    debug!(container = %container.id, "already stopped");
                }
                Ok(Transition::Changed) => {}
                Err(e) => {
                    warn!(container = %container.id, error = %e, "failed to stop container");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(namespace = ns, app = name, "application stopped");
                Ok(())
            }
        }
    }

    /// Restarts every container of an application, stopping at the first
    /// failure.
    pub async fn restart_application(&self, name: &str) -> Result<(), CloudwayError> {
        let ns = self.namespace()?;
        let _guard = self.lock(ns, name).await;
        let containers = self.existing(ns, name, &ServiceFilter::All).await?;

        for container in &containers {
            self.retract(container).await;
            self.broker.runtime.restart(container).await?;
            self.publish(container).await;
        }
        info!(namespace = ns, app = name, "application restarted");
        Ok(())
    }

    /// Grows or shrinks the framework replica set to `target` and returns the
    /// resulting replicas, oldest first. New replicas are not started.
    pub async fn scale_application(
        &self,
        name: &str,
        target: u32,
    ) -> Result<Vec<ContainerHandle>, CloudwayError> {
        self.scale_by(name, ScaleRequest::To(target)).await
    }

    /// Like [`Self::scale_application`], with the target computed from the
    /// live replica count under the application lock.
    pub async fn scale_by(
        &self,
        name: &str,
        request: ScaleRequest,
    ) -> Result<Vec<ContainerHandle>, CloudwayError> {
        if request == ScaleRequest::To(0) {
            return Err(CloudwayError::Validation(
                "scale target must be at least 1".to_string(),
            ));
        }
        let ns = self.namespace()?;
        let _guard = self.lock(ns, name).await;

        let record = self.broker.records.get_application(ns, name).await?;
        let current = self.existing(ns, name, &ServiceFilter::Framework).await?;
        let target = request.target(current.len())?;
        let target_len = target as usize;

        if target_len > current.len() {
            let representative = match (current.first(), &record) {
                (Some(replica), _) => replica.tag.clone(),
                (None, Some(record)) => match record.framework_tag() {
                    Some(tag) => PluginTag::parse(tag)?,
                    None => {
                        return Err(CloudwayError::Internal(format!(
                            "application {name} has no framework"
                        )));
                    }
                },
                (None, None) => {
                    return Err(CloudwayError::ApplicationNotFound {
                        name: name.to_string(),
                    });
                }
            };
            let plugin = self.resolve_pinned(ns, &representative)?;
            let added = self
                .broker
                .runtime
                .create_containers(&CreateContainers {
                    app: name.to_string(),
                    namespace: ns.to_string(),
                    plugins: vec![ResolvedPlugin {
                        tag: representative,
                        plugin,
                    }],
                    count: (target_len - current.len()) as u32,
                })
                .await?;
            info!(namespace = ns, app = name, added = added.len(), "application scaled up");
        } else if target_len < current.len() {
            let mut first_error = None;
            for container in current[target_len..].iter().rev() {
                self.retract(container).await;
                if let Err(e) = self.broker.runtime.destroy(container).await {
                    warn!(container = %container.id, error = %e, "failed to remove replica");
                    first_error.get_or_insert(e);
                }
            }
            if let Some(e) = first_error {
                return Err(e);
            }
            info!(
                namespace = ns,
                app = name,
                removed = current.len() - target_len,
                "application scaled down"
            );
        }

        if let Some(mut record) = record
            && record.scaling != target
        {
            record.scaling = target;
            self.broker.records.put_application(ns, &record).await?;
        }

        self.find(ns, name, &ServiceFilter::Framework).await
    }

    /// Destroys every container and then the record. The record survives if
    /// any container could not be destroyed.
    pub async fn remove_application(&self, name: &str) -> Result<(), CloudwayError> {
        let ns = self.namespace()?;
        let _guard = self.lock(ns, name).await;
        let containers = self.existing(ns, name, &ServiceFilter::All).await?;

        let mut first_error = None;
        for container in &containers {
            self.retract(container).await;
            if let Err(e) = self.broker.runtime.destroy(container).await {
                warn!(container = %container.id, error = %e, "failed to destroy container");
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        self.broker.records.remove_application(ns, name).await?;
        info!(namespace = ns, app = name, "application removed");
        Ok(())
    }

    /// The caller's application records, ordered by name.
    pub async fn list_applications(&self) -> Result<Vec<ApplicationRecord>, CloudwayError> {
        let ns = self.namespace()?;
        self.broker.records.list_applications(ns).await
    }

    pub async fn application_info(&self, name: &str) -> Result<ApplicationInfo, CloudwayError> {
        let ns = self.namespace()?;
        let record = self
            .broker
            .records
            .get_application(ns, name)
            .await?
            .ok_or_else(|| CloudwayError::ApplicationNotFound {
                name: name.to_string(),
            })?;

        let urls = self.broker.settings.application_urls(name, ns)?;
        let mut framework = None;
        let mut services = Vec::new();
        for tag in &record.plugins {
            let resolved = PluginTag::parse(tag).and_then(|t| self.resolve_pinned(ns, &t));
            match resolved {
                Ok(plugin) if plugin.category.is_framework() => {
                    framework = Some(plugin.without_path());
                }
                Ok(plugin) => services.push(plugin.without_path()),
                Err(e) => debug!(app = name, tag = %tag, error = %e, "plugin no longer resolvable"),
            }
        }
        let scaling = self.find(ns, name, &ServiceFilter::Framework).await?.len();

        Ok(ApplicationInfo {
            name: record.name,
            namespace: ns.to_string(),
            created_at: record.created_at,
            url: urls.url,
            ssh_url: urls.ssh_url,
            clone_url: urls.clone_url,
            framework,
            services,
            scaling,
        })
    }

    /// Live containers of an application matching `filter`, oldest first.
    pub async fn find_containers(
        &self,
        name: &str,
        filter: &ServiceFilter,
    ) -> Result<Vec<ContainerHandle>, CloudwayError> {
        let ns = self.namespace()?;
        self.existing(ns, name, filter).await
    }

    /// Containers of one service (`""`, `*` and `_` select all), which must
    /// not be empty.
    async fn service_containers(
        &self,
        ns: &str,
        name: &str,
        service: &str,
    ) -> Result<Vec<ContainerHandle>, CloudwayError> {
        let containers = self
            .existing(ns, name, &ServiceFilter::from_segment(service))
            .await?;
        if containers.is_empty() {
            return Err(CloudwayError::ApplicationNotFound {
                name: format!("{name}/{service}"),
            });
        }
        Ok(containers)
    }

    /// Environment of the first container of a service.
    pub async fn environment(
        &self,
        name: &str,
        service: &str,
    ) -> Result<HashMap<String, String>, CloudwayError> {
        let ns = self.namespace()?;
        let containers = self.service_containers(ns, name, service).await?;
        self.broker.runtime.environment(&containers[0]).await
    }

    /// Exports `env` into, or with `remove` deletes its keys from, every
    /// container of a service.
    pub async fn set_environment(
        &self,
        name: &str,
        service: &str,
        env: &BTreeMap<String, String>,
        remove: bool,
    ) -> Result<(), CloudwayError> {
        if let Some(bad) = env.keys().find(|k| !ENV_KEY_PATTERN.is_match(k)) {
            return Err(CloudwayError::Validation(format!(
                "{bad}: invalid environment variable key"
            )));
        }
        let ns = self.namespace()?;
        if env.is_empty() {
            return Ok(());
        }

        let _guard = self.lock(ns, name).await;
        let containers = self.service_containers(ns, name, service).await?;

        let mut args = vec![SETENV_COMMAND.to_string(), "setenv".to_string()];
        if remove {
            args.push("-d".to_string());
            args.extend(env.keys().cloned());
        } else {
            args.push("--export".to_string());
            args.extend(env.iter().map(|(k, v)| format!("{k}={v}")));
        }

        for container in &containers {
            self.broker.runtime.exec(container, "root", &args).await?;
        }
        info!(namespace = ns, app = name, service, keys = env.len(), remove, "environment updated");
        Ok(())
    }

    fn scm(&self) -> Result<&Arc<dyn Scm>, CloudwayError> {
        self.broker.scm.as_ref().ok_or_else(|| CloudwayError::Scm {
            message: "source control is not configured".to_string(),
        })
    }

    /// Deploys `branch` of the application's repository.
    pub async fn deploy(&self, name: &str, branch: &str) -> Result<(), CloudwayError> {
        let ns = self.namespace()?;
        let scm = self.scm()?;
        let _guard = self.lock(ns, name).await;
        self.existing(ns, name, &ServiceFilter::All).await?;
        scm.deploy(ns, name, branch).await?;
        info!(namespace = ns, app = name, branch, "deployment requested");
        Ok(())
    }

    pub async fn deployments(&self, name: &str) -> Result<Deployments, CloudwayError> {
        let ns = self.namespace()?;
        let scm = self.scm()?;
        self.existing(ns, name, &ServiceFilter::All).await?;
        Ok(Deployments {
            current: scm.deployment_branch(ns, name).await?,
            branches: scm.deployment_branches(ns, name).await?,
        })
    }

    /// Resolves a tag string as the caller sees it.
    pub fn plugin_info(&self, tag: &str) -> Result<Plugin, CloudwayError> {
        self.broker
            .resolver
            .resolve_str(&self.user.namespace, tag)
            .map(Plugin::without_path)
    }

    pub fn installed_plugins(&self, category: Option<Category>) -> Result<Vec<Plugin>, CloudwayError> {
        Ok(self
            .broker
            .resolver
            .installed_plugins(&self.user.namespace, category)?
            .into_iter()
            .map(Plugin::without_path)
            .collect())
    }

    pub fn user_plugins(&self, category: Option<Category>) -> Result<Vec<Plugin>, CloudwayError> {
        Ok(self
            .broker
            .resolver
            .user_plugins(&self.user.namespace, category)?
            .into_iter()
            .map(Plugin::without_path)
            .collect())
    }

    /// Installs a plugin into the caller's namespace.
    pub async fn install_plugin(&self, source: &Path) -> Result<Plugin, CloudwayError> {
        let ns = self.namespace()?;
        self.broker
            .hub
            .install_plugin(ns, source)
            .await
            .map(Plugin::without_path)
    }

    /// Removes a plugin from the caller's namespace. Tags naming another
    /// namespace are rejected.
    pub async fn remove_plugin(&self, tag: &str) -> Result<(), CloudwayError> {
        let ns = self.namespace()?;
        let tag = PluginTag::parse(tag)?;
        if !tag.namespace.is_empty() && tag.namespace != ns {
            return Err(CloudwayError::PluginNotFound {
                tag: tag.clean().to_string(),
            });
        }
        self.broker.hub.remove_plugin(ns, &tag).await
    }
}

fn validate_name(name: &str) -> Result<(), CloudwayError> {
    if APP_NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(CloudwayError::Validation(format!(
            "invalid application name `{name}`: only lower case letters, digits or underscores are allowed, starting with a letter"
        )))
    }
}

/// The exact plugin a slot resolved to, keeping the slot's service role.
fn pinned_tag(resolved: &ResolvedPlugin) -> PluginTag {
    resolved
        .plugin
        .tag()
        .with_service(resolved.tag.service.clone())
}
