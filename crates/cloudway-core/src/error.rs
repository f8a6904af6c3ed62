// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Cloudway control plane.

use thiserror::Error;

/// Coarse classification of a [`CloudwayError`], used by transport layers to
/// pick a status code without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied malformed or out-of-range input.
    BadRequest,
    /// The referenced plugin, version, or application does not exist.
    NotFound,
    /// The target already exists.
    Conflict,
    /// The operation requires a tenant namespace the caller does not have.
    Forbidden,
    /// A collaborator (runtime, proxy, SCM, storage) failed.
    Unavailable,
    /// Anything else.
    Internal,
}

/// The primary error type shared by every Cloudway crate.
#[derive(Debug, Error)]
pub enum CloudwayError {
    /// A plugin tag string could not be parsed.
    #[error("invalid plugin tag `{tag}`: {reason}")]
    Parse { tag: String, reason: String },

    /// No version of the plugin is installed in the looked-up scope.
    #[error("{tag}: plugin not found")]
    PluginNotFound { tag: String },

    /// The plugin exists but the requested version is not installed.
    #[error("{tag}: version not found: {version}")]
    VersionNotFound { tag: String, version: String },

    /// The named application has no record and no containers.
    #[error("application not found: {name}")]
    ApplicationNotFound { name: String },

    /// An application with this name already exists in the namespace.
    #[error("application already exists: {name}")]
    ApplicationExists { name: String },

    /// The operation requires a tenant namespace.
    #[error("user `{user}` has no namespace")]
    NoNamespace { user: String },

    /// Input violated a format or range rule. Raised before any side effect.
    #[error("validation error: {0}")]
    Validation(String),

    /// A container runtime call failed.
    #[error("runtime error: {operation} {app}{}: {message}", .container.as_ref().map(|c| format!(" [{c}]")).unwrap_or_default())]
    Runtime {
        operation: String,
        app: String,
        container: Option<String>,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A routing backend call failed.
    #[error("proxy error: {message}")]
    Proxy {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No proxy backend is registered for the URL scheme.
    #[error("unsupported proxy scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    /// The proxy URL is empty.
    #[error("proxy URL not configured")]
    ProxyNotConfigured,

    /// A plugin manifest is missing or invalid.
    #[error("manifest error: {0}")]
    Manifest(String),

    /// Filesystem or database failure.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The source-control collaborator failed.
    #[error("scm error: {message}")]
    Scm { message: String },

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CloudwayError {
    /// Wraps an I/O error as a storage error.
    pub fn io(err: std::io::Error) -> Self {
        CloudwayError::Storage {
            source: Box::new(err),
        }
    }

    /// Builds a runtime error with application and container context.
    pub fn runtime(
        operation: impl Into<String>,
        app: impl Into<String>,
        container: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        CloudwayError::Runtime {
            operation: operation.into(),
            app: app.into(),
            container: container.map(str::to_string),
            message: message.into(),
            source: None,
        }
    }

    /// Returns the coarse classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CloudwayError::Parse { .. } | CloudwayError::Validation(_) => ErrorKind::BadRequest,
            CloudwayError::PluginNotFound { .. }
            | CloudwayError::VersionNotFound { .. }
            | CloudwayError::ApplicationNotFound { .. } => ErrorKind::NotFound,
            CloudwayError::ApplicationExists { .. } => ErrorKind::Conflict,
            CloudwayError::NoNamespace { .. } => ErrorKind::Forbidden,
            CloudwayError::Runtime { .. }
            | CloudwayError::Proxy { .. }
            | CloudwayError::Storage { .. }
            | CloudwayError::Scm { .. } => ErrorKind::Unavailable,
            CloudwayError::UnsupportedScheme { .. }
            | CloudwayError::ProxyNotConfigured
            | CloudwayError::Manifest(_)
            | CloudwayError::Config(_)
            | CloudwayError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True for the "not found" family of resolution misses.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
