// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory container runtime for deterministic broker tests.
//!
//! `MockRuntime` tracks every container it creates together with its running
//! state and environment, records `exec` calls, and can be told to fail a
//! given operation globally or for one container. Every call yields to the
//! scheduler so concurrent broker operations get a chance to interleave.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;

use cloudway_core::{
    CloudwayError, ContainerHandle, ContainerRuntime, CreateContainers, ServiceFilter, Transition,
};

/// Runtime operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeOp {
    Create,
    Start,
    Stop,
    Restart,
    Destroy,
    Exec,
}

/// A recorded `exec` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecCall {
    pub container: String,
    pub user: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone)]
struct MockContainer {
    handle: ContainerHandle,
    running: bool,
    env: HashMap<String, String>,
}

#[derive(Default)]
struct State {
    containers: Vec<MockContainer>,
    next_id: u64,
    /// `(op, None)` fails every call; `(op, Some(id))` fails one container.
    failures: Vec<(RuntimeOp, Option<String>)>,
    execs: Vec<ExecCall>,
    create_calls: usize,
    /// Successful operations in completion order.
    log: Vec<RuntimeOp>,
}

impl State {
    fn should_fail(&self, op: RuntimeOp, id: Option<&str>) -> bool {
        self.failures
            .iter()
            .any(|(o, target)| *o == op && (target.is_none() || target.as_deref() == id))
    }

    fn container_mut(&mut self, id: &str) -> Option<&mut MockContainer> {
        self.containers.iter_mut().find(|c| c.handle.id == id)
    }
}

/// A container runtime backed by an in-memory table.
pub struct MockRuntime {
    state: Mutex<State>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    /// Makes every future call of `op` fail.
    pub async fn fail(&self, op: RuntimeOp) {
        self.state.lock().await.failures.push((op, None));
    }

    /// Makes future calls of `op` on one container fail.
    pub async fn fail_container(&self, op: RuntimeOp, id: &str) {
        self.state
            .lock()
            .await
            .failures
            .push((op, Some(id.to_string())));
    }

    pub async fn clear_failures(&self) {
        self.state.lock().await.failures.clear();
    }

    /// Every live container, oldest first.
    pub async fn containers(&self) -> Vec<ContainerHandle> {
        let state = self.state.lock().await;
        state.containers.iter().map(|c| c.handle.clone()).collect()
    }

    pub async fn container_count(&self) -> usize {
        self.state.lock().await.containers.len()
    }

    pub async fn is_running(&self, id: &str) -> bool {
        let state = self.state.lock().await;
        state
            .containers
            .iter()
            .any(|c| c.handle.id == id && c.running)
    }

    pub async fn running_count(&self) -> usize {
        let state = self.state.lock().await;
        state.containers.iter().filter(|c| c.running).count()
    }

    pub async fn exec_calls(&self) -> Vec<ExecCall> {
        self.state.lock().await.execs.clone()
    }

    /// Successful operations in the order they completed.
    pub async fn operations(&self) -> Vec<RuntimeOp> {
        self.state.lock().await.log.clone()
    }

    /// Number of `create_containers` calls, successful or not.
    pub async fn create_calls(&self) -> usize {
        self.state.lock().await.create_calls
    }

    /// Seeds an environment variable on a container.
    pub async fn set_env(&self, id: &str, key: &str, value: &str) {
        if let Some(c) = self.state.lock().await.container_mut(id) {
            c.env.insert(key.to_string(), value.to_string());
        }
    }

    async fn transition(
        &self,
        op: RuntimeOp,
        container: &ContainerHandle,
        target: Option<bool>,
    ) -> Result<Transition, CloudwayError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().await;
        if state.should_fail(op, Some(&container.id)) {
            return Err(injected(op, container));
        }
        let Some(c) = state.container_mut(&container.id) else {
            return Err(CloudwayError::runtime(
                format!("{op:?}").to_lowercase(),
                &container.app,
                Some(&container.id),
                "no such container",
            ));
        };
        let transition = match target {
            Some(running) if c.running == running => Transition::Unchanged,
            Some(running) => {
                c.running = running;
                Transition::Changed
            }
            None => {
                c.running = true;
                Transition::Changed
            }
        };
        state.log.push(op);
        Ok(transition)
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn injected(op: RuntimeOp, container: &ContainerHandle) -> CloudwayError {
    CloudwayError::runtime(
        format!("{op:?}").to_lowercase(),
        &container.app,
        Some(&container.id),
        "injected failure",
    )
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn create_containers(
        &self,
        request: &CreateContainers,
    ) -> Result<Vec<ContainerHandle>, CloudwayError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().await;
        state.create_calls += 1;
        if state.should_fail(RuntimeOp::Create, None) {
            return Err(CloudwayError::runtime(
                "create",
                &request.app,
                None,
                "injected failure",
            ));
        }

        let base = Utc::now();
        let mut created = Vec::new();
        for resolved in &request.plugins {
            for _ in 0..request.count {
                state.next_id += 1;
                let seq = state.next_id;
                let handle = ContainerHandle {
                    id: format!("mock-{seq:04}"),
                    app: request.app.clone(),
                    namespace: request.namespace.clone(),
                    tag: resolved
                        .plugin
                        .tag()
                        .with_service(resolved.tag.service.clone()),
                    category: resolved.plugin.category,
                    endpoints: resolved.plugin.endpoints.clone(),
                    created_at: base + Duration::milliseconds(seq as i64),
                };
                let env = HashMap::from([
                    ("CLOUDWAY_APP_NAME".to_string(), request.app.clone()),
                    ("CLOUDWAY_APP_NAMESPACE".to_string(), request.namespace.clone()),
                ]);
                state.containers.push(MockContainer {
                    handle: handle.clone(),
                    running: false,
                    env,
                });
                created.push(handle);
            }
        }
        state.log.push(RuntimeOp::Create);
        Ok(created)
    }

    async fn find_containers(
        &self,
        app: &str,
        namespace: &str,
        filter: &ServiceFilter,
    ) -> Result<Vec<ContainerHandle>, CloudwayError> {
        tokio::task::yield_now().await;
        let state = self.state.lock().await;
        Ok(state
            .containers
            .iter()
            .filter(|c| c.handle.app == app && c.handle.namespace == namespace)
            .filter(|c| filter.matches(&c.handle))
            .map(|c| c.handle.clone())
            .collect())
    }

    async fn start(&self, container: &ContainerHandle) -> Result<Transition, CloudwayError> {
        self.transition(RuntimeOp::Start, container, Some(true)).await
    }

    async fn stop(&self, container: &ContainerHandle) -> Result<Transition, CloudwayError> {
        self.transition(RuntimeOp::Stop, container, Some(false)).await
    }

    async fn restart(&self, container: &ContainerHandle) -> Result<Transition, CloudwayError> {
        self.transition(RuntimeOp::Restart, container, None).await
    }

    async fn destroy(&self, container: &ContainerHandle) -> Result<(), CloudwayError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().await;
        if state.should_fail(RuntimeOp::Destroy, Some(&container.id)) {
            return Err(injected(RuntimeOp::Destroy, container));
        }
        state.containers.retain(|c| c.handle.id != container.id);
        state.log.push(RuntimeOp::Destroy);
        Ok(())
    }

    async fn exec(
        &self,
        container: &ContainerHandle,
        user: &str,
        args: &[String],
    ) -> Result<(), CloudwayError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().await;
        if state.should_fail(RuntimeOp::Exec, Some(&container.id)) {
            return Err(injected(RuntimeOp::Exec, container));
        }
        state.execs.push(ExecCall {
            container: container.id.clone(),
            user: user.to_string(),
            args: args.to_vec(),
        });

        // Emulate the in-container environment helper.
        if let Some(c) = state.container_mut(&container.id)
            && args.get(1).map(String::as_str) == Some("setenv")
        {
            match args.get(2).map(String::as_str) {
                Some("--export") => {
                    for pair in &args[3..] {
                        if let Some((k, v)) = pair.split_once('=') {
                            c.env.insert(k.to_string(), v.to_string());
                        }
                    }
                }
                Some("-d") => {
                    for key in &args[3..] {
                        c.env.remove(key);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    async fn environment(
        &self,
        container: &ContainerHandle,
    ) -> Result<HashMap<String, String>, CloudwayError> {
        let mut state = self.state.lock().await;
        state
            .container_mut(&container.id)
            .map(|c| c.env.clone())
            .ok_or_else(|| {
                CloudwayError::runtime("environment", &container.app, Some(&container.id), "no such container")
            })
    }
}
