// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock source-control collaborator.

use async_trait::async_trait;
use tokio::sync::Mutex;

use cloudway_core::{Branch, CloudwayError, Scm};

/// Serves a fixed branch list and records deployments.
pub struct MockScm {
    branches: Vec<Branch>,
    current: Mutex<String>,
    deploys: Mutex<Vec<(String, String, String)>>,
}

impl MockScm {
    /// Creates a repository whose branches are `names`; the first is deployed.
    pub fn with_branches(names: &[&str]) -> Self {
        let branches = names
            .iter()
            .map(|n| Branch {
                id: format!("refs/heads/{n}"),
                display_id: n.to_string(),
                kind: "BRANCH".to_string(),
            })
            .collect();
        Self {
            branches,
            current: Mutex::new(names.first().map(|n| n.to_string()).unwrap_or_default()),
            deploys: Mutex::new(Vec::new()),
        }
    }

    /// Recorded `(namespace, app, branch)` deployments.
    pub async fn deploys(&self) -> Vec<(String, String, String)> {
        self.deploys.lock().await.clone()
    }
}

#[async_trait]
impl Scm for MockScm {
    async fn deploy(&self, namespace: &str, app: &str, branch: &str) -> Result<(), CloudwayError> {
        if !self.branches.iter().any(|b| b.display_id == branch) {
            return Err(CloudwayError::Scm {
                message: format!("unknown branch `{branch}`"),
            });
        }
        self.deploys
            .lock()
            .await
            .push((namespace.to_string(), app.to_string(), branch.to_string()));
        *self.current.lock().await = branch.to_string();
        Ok(())
    }

    async fn deployment_branch(&self, _namespace: &str, _app: &str) -> Result<Branch, CloudwayError> {
        let current = self.current.lock().await;
        self.branches
            .iter()
            .find(|b| b.display_id == *current)
            .cloned()
            .ok_or_else(|| CloudwayError::Scm {
                message: "no deployed branch".to_string(),
            })
    }

    async fn deployment_branches(
        &self,
        _namespace: &str,
        _app: &str,
    ) -> Result<Vec<Branch>, CloudwayError> {
        Ok(self.branches.clone())
    }
}
