// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Container runtime contract.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::CloudwayError;
use crate::types::{ContainerHandle, CreateContainers, ServiceFilter, Transition};

/// Issues container intents to whatever actually runs containers.
///
/// The runtime is the source of truth for which containers exist. Callers
/// re-read through [`ContainerRuntime::find_containers`] on every operation
/// instead of caching handles.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Creates `request.count` containers for each plugin in the request.
    /// Containers are created stopped.
    async fn create_containers(
        &self,
        request: &CreateContainers,
    ) -> Result<Vec<ContainerHandle>, CloudwayError>;

    /// Lists live containers of an application, oldest first.
    async fn find_containers(
        &self,
        app: &str,
        namespace: &str,
        filter: &ServiceFilter,
    ) -> Result<Vec<ContainerHandle>, CloudwayError>;

    async fn start(&self, container: &ContainerHandle) -> Result<Transition, CloudwayError>;

    async fn stop(&self, container: &ContainerHandle) -> Result<Transition, CloudwayError>;

    async fn restart(&self, container: &ContainerHandle) -> Result<Transition, CloudwayError>;

    /// Removes the container, stopping it first if needed.
    async fn destroy(&self, container: &ContainerHandle) -> Result<(), CloudwayError>;

    /// Runs a command inside the container as `user`.
    async fn exec(
        &self,
        container: &ContainerHandle,
        user: &str,
        args: &[String],
    ) -> Result<(), CloudwayError>;

    /// Returns the container's environment variables.
    async fn environment(
        &self,
        container: &ContainerHandle,
    ) -> Result<HashMap<String, String>, CloudwayError>;
}
