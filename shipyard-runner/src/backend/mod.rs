//! Collaborator interfaces
//!
//! The engine talks to the outside world only through these traits. Each
//! has one production implementation in this module tree and in-memory
//! fakes in tests, so orchestration logic never depends on a concrete
//! container engine, cloud API or installer toolchain.

pub mod cluster;
pub mod docker;
pub mod installer;
pub mod registry;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use shipyard_core::domain::build::BuildSpec;
use shipyard_core::domain::deployment::DeploymentSpec;
use shipyard_core::domain::installer::InstallerSpec;
use shipyard_core::domain::resource::ResourceHandle;
use shipyard_core::domain::service::ServiceStatus;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

pub use cluster::ControlPlane;
pub use docker::DockerCli;
pub use installer::{InnoSetup, InnoSetupConfig};
pub use registry::ImageRegistry;

/// Container image build and local environment
#[async_trait]
pub trait BuildBackend: Send + Sync {
    /// Verifies the container engine (and compose) is usable
    async fn check_environment(&self, cancel: &CancellationToken) -> Result<()>;

    /// Builds the image described by `spec`
    ///
    /// # Returns
    /// The local image reference that was tagged
    async fn build(&self, spec: &BuildSpec, cancel: &CancellationToken) -> Result<String>;

    /// Starts the local compose environment in the background
    async fn compose_up(&self, spec: &BuildSpec, cancel: &CancellationToken) -> Result<()>;

    /// Stops the local compose environment and removes its volumes
    async fn compose_down(&self, spec: &BuildSpec, cancel: &CancellationToken) -> Result<()>;

    /// Probes an HTTP endpoint, returning whether it answered 2xx
    async fn health_check(&self, url: &str) -> Result<bool>;
}

/// Image registry
#[async_trait]
pub trait RegistryBackend: Send + Sync {
    /// Returns the repository URI, creating the repository if needed
    async fn ensure_repository(&self, name: &str) -> Result<String>;

    /// Pushes a local image to `<repository_uri>:<tag>`
    ///
    /// # Returns
    /// The remote image reference
    async fn push(
        &self,
        local_image: &str,
        repository_uri: &str,
        tag: &str,
        cancel: &CancellationToken,
    ) -> Result<String>;
}

/// Container control plane
///
/// Lookups return `Ok(None)` when the resource does not exist; errors are
/// reserved for transport, auth and backend failures.
#[async_trait]
pub trait ClusterBackend: Send + Sync {
    /// Cheap authenticated call proving the control plane is reachable
    async fn check_connectivity(&self) -> Result<()>;

    async fn find_cluster(&self, name: &str) -> Result<Option<ResourceHandle>>;
    async fn create_cluster(&self, spec: &DeploymentSpec) -> Result<ResourceHandle>;
    async fn update_cluster(&self, spec: &DeploymentSpec) -> Result<ResourceHandle>;

    async fn find_workload(&self, family: &str) -> Result<Option<ResourceHandle>>;
    /// Registers the first revision of a family
    async fn register_workload(&self, spec: &DeploymentSpec) -> Result<ResourceHandle>;
    /// Registers a new revision only if the latest one differs from `spec`
    async fn update_workload(&self, spec: &DeploymentSpec) -> Result<ResourceHandle>;

    async fn find_service(&self, cluster: &str, service: &str) -> Result<Option<ResourceHandle>>;
    async fn create_service(&self, spec: &DeploymentSpec) -> Result<ResourceHandle>;
    async fn update_service(&self, spec: &DeploymentSpec) -> Result<ResourceHandle>;

    /// Fresh status snapshot; `None` if the service is not visible yet
    async fn service_status(&self, cluster: &str, service: &str) -> Result<Option<ServiceStatus>>;
}

/// Desktop installer toolchain
#[async_trait]
pub trait InstallerBackend: Send + Sync {
    /// Whether the installer compiler is present and runs
    async fn check_toolchain(&self, cancel: &CancellationToken) -> bool;

    /// Renders the installer script for `spec`
    fn generate_script(&self, spec: &InstallerSpec) -> String;

    /// Saves and compiles `script`, returning the produced installer
    async fn compile(
        &self,
        spec: &InstallerSpec,
        script: &str,
        cancel: &CancellationToken,
    ) -> Result<PathBuf>;

    /// Signs `binary` in place, returning the signed installer path
    async fn sign(
        &self,
        binary: &Path,
        certificate: &Path,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<PathBuf>;
}
