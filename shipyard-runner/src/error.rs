//! Error types for the pipeline engine.

use std::path::PathBuf;
use std::time::Duration;

use shipyard_client::ClientError;
use shipyard_core::domain::resource::ResourceKind;
use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Classified failures raised by collaborators and engine components.
///
/// Stage runners map these onto stage results; the orchestrator never
/// inspects them directly.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ─────────────────────────────────────────────────────────────────────────
    // Backend errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Temporary failure; only the stability watcher retries these.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The backend refused the desired spec for a resource.
    #[error("{kind} '{name}' rejected: {message}")]
    Reconcile {
        kind: ResourceKind,
        name: String,
        message: String,
    },

    /// A resource that must exist at this point is gone.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: ResourceKind, name: String },

    /// Control plane or registry call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    // ─────────────────────────────────────────────────────────────────────────
    // Tooling errors
    // ─────────────────────────────────────────────────────────────────────────
    /// An external tool is not installed or not usable.
    #[error("toolchain not available: {0}")]
    ToolchainMissing(String),

    /// An external tool ran but exited unsuccessfully.
    #[error("`{program}` exited with code {exit_code}: {stderr}")]
    Process {
        program: String,
        exit_code: i32,
        stderr: String,
    },

    /// A file the step depends on does not exist.
    #[error("required file not found: {}", .0.display())]
    MissingFile(PathBuf),

    // ─────────────────────────────────────────────────────────────────────────
    // Control flow
    // ─────────────────────────────────────────────────────────────────────────
    /// A deadline was exceeded.
    #[error("{what} timed out after {}s", .limit.as_secs())]
    Timeout { what: String, limit: Duration },

    /// The run was cancelled from outside.
    #[error("cancelled")]
    Cancelled,

    // ─────────────────────────────────────────────────────────────────────────
    // Local errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    /// Whether retrying later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transient(_) => true,
            Self::Client(e) => e.is_transient(),
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Wraps a failed create/update call.
    ///
    /// 4xx responses mean the backend rejected what we asked for; anything
    /// else is passed through unchanged so outages are not misreported.
    pub fn rejected(kind: ResourceKind, name: impl Into<String>, err: ClientError) -> Self {
        match err {
            ClientError::ApiError { status, message }
                if (400..500).contains(&status) && status != 429 =>
            {
                Self::Reconcile {
                    kind,
                    name: name.into(),
                    message: format!("status {status}: {message}"),
                }
            }
            other => Self::Client(other),
        }
    }
}
