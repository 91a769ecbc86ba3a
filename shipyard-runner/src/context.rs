//! Execution context for a pipeline run
//!
//! Everything a stage needs is passed in explicitly:
//! - the collaborator backends
//! - the immutable build, deployment and installer specs
//! - run settings (watch timing, local verification, signing)
//! - the cancellation token shared by every long wait
//!
//! Nothing here is mutated once the run starts. Values produced by one
//! stage and consumed by a later one travel in [`RunArtifacts`], owned by
//! the orchestrator.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use shipyard_core::domain::build::BuildSpec;
use shipyard_core::domain::deployment::DeploymentSpec;
use shipyard_core::domain::installer::InstallerSpec;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::backend::{BuildBackend, ClusterBackend, InstallerBackend, RegistryBackend};

/// The collaborator set for one run
#[derive(Clone)]
pub struct Backends {
    pub build: Arc<dyn BuildBackend>,
    pub registry: Arc<dyn RegistryBackend>,
    pub cluster: Arc<dyn ClusterBackend>,
    pub installer: Arc<dyn InstallerBackend>,
}

/// Stability polling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchSettings {
    pub poll_interval: Duration,
    /// Wait after a failed status fetch
    pub error_backoff: Duration,
    pub timeout: Duration,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            error_backoff: Duration::from_secs(5),
            timeout: Duration::from_secs(600),
        }
    }
}

/// Local compose verification between build and deploy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifySettings {
    pub enabled: bool,
    /// Fail the build stage when verification fails
    pub required: bool,
    pub health_url: String,
    /// Time given to the environment before probing
    pub warmup: Duration,
}

impl Default for VerifySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            required: false,
            health_url: "http://localhost:80/health".to_string(),
            warmup: Duration::from_secs(10),
        }
    }
}

/// Code signing credentials for the installer
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSettings {
    pub certificate: PathBuf,
    pub password: String,
}

impl std::fmt::Debug for SigningSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningSettings")
            .field("certificate", &self.certificate)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where the published image goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryTarget {
    pub repository: String,
    pub tag: String,
}

/// Per-run settings derived from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub watch: WatchSettings,
    pub verify: VerifySettings,
    pub registry: RegistryTarget,
    /// Present only when both certificate and password are configured
    pub signing: Option<SigningSettings>,
    pub skip_installer: bool,
}

/// Read-only state shared by all stages of a run
pub struct PipelineContext {
    pub run_id: Uuid,
    pub backends: Backends,
    pub build: Arc<BuildSpec>,
    pub deployment: Arc<DeploymentSpec>,
    pub installer: Arc<InstallerSpec>,
    pub settings: RunSettings,
    pub cancel: CancellationToken,
}

impl PipelineContext {
    pub fn new(
        backends: Backends,
        build: BuildSpec,
        deployment: DeploymentSpec,
        installer: InstallerSpec,
        settings: RunSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            backends,
            build: Arc::new(build),
            deployment: Arc::new(deployment),
            installer: Arc::new(installer),
            settings,
            cancel,
        }
    }
}

/// Something a stage produced for later stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Locally built image reference
    LocalImage(String),
    /// Image reference in the registry
    RemoteImage(String),
    /// Path of the packaged installer
    Installer(PathBuf),
}

/// Artifacts collected so far in a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArtifacts {
    pub local_image: Option<String>,
    pub remote_image: Option<String>,
    pub installer: Option<PathBuf>,
}

impl RunArtifacts {
    pub fn record(&mut self, artifact: Artifact) {
        match artifact {
            Artifact::LocalImage(image) => self.local_image = Some(image),
            Artifact::RemoteImage(image) => self.remote_image = Some(image),
            Artifact::Installer(path) => self.installer = Some(path),
        }
    }
}
