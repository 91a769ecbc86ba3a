//! In-memory collaborators for tests
//!
//! Each fake counts its calls so tests can assert which operations ran,
//! and can be told to fail at a specific step.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use shipyard_core::domain::build::BuildSpec;
use shipyard_core::domain::deployment::{DeploymentSpec, NetworkPlacement, RolloutPolicy};
use shipyard_core::domain::installer::InstallerSpec;
use shipyard_core::domain::resource::ResourceHandle;
use shipyard_core::domain::service::{LifecycleState, LoadBalancerEndpoint, ServiceStatus};
use shipyard_core::dto::workload::RegisterWorkload;
use tokio_util::sync::CancellationToken;

use crate::backend::{BuildBackend, ClusterBackend, InstallerBackend, RegistryBackend};
use crate::context::{
    Backends, PipelineContext, RegistryTarget, RunSettings, VerifySettings, WatchSettings,
};
use crate::error::{PipelineError, Result};

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

fn read(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn deployment_spec() -> DeploymentSpec {
    DeploymentSpec {
        region: "us-east-1".to_string(),
        cluster_name: "production-cluster".to_string(),
        service_name: "web".to_string(),
        task_family: "web-task".to_string(),
        container_name: "app".to_string(),
        image_uri: "web:latest".to_string(),
        desired_count: 2,
        cpu: 512,
        memory: 1024,
        container_ports: vec![8080],
        environment: vec![],
        network: NetworkPlacement {
            subnets: vec!["subnet-a".to_string(), "subnet-b".to_string()],
            security_group: Some("sg-123".to_string()),
            assign_public_ip: true,
        },
        load_balancer: None,
        tags: BTreeMap::new(),
        execution_role_arn: None,
        task_role_arn: None,
        rollout: RolloutPolicy::default(),
        autoscaling: None,
    }
}

pub fn build_spec() -> BuildSpec {
    BuildSpec {
        project_name: "web".to_string(),
        dockerfile: PathBuf::from("./Dockerfile"),
        compose_file: PathBuf::from("./docker-compose.yml"),
        context: PathBuf::from("."),
        tag: "latest".to_string(),
        build_args: BTreeMap::new(),
        platforms: vec!["linux/amd64".to_string()],
        timeout_secs: 600,
        pull_on_up: false,
    }
}

pub fn run_settings() -> RunSettings {
    RunSettings {
        watch: WatchSettings {
            poll_interval: Duration::from_secs(10),
            error_backoff: Duration::from_secs(5),
            timeout: Duration::from_secs(600),
        },
        verify: VerifySettings::default(),
        registry: RegistryTarget {
            repository: "web".to_string(),
            tag: "latest".to_string(),
        },
        signing: None,
        skip_installer: false,
    }
}

pub fn stable_status(desired: u32) -> ServiceStatus {
    ServiceStatus {
        service_name: "web".to_string(),
        lifecycle: LifecycleState::Active,
        desired_count: desired,
        running_count: desired,
        pending_count: 0,
        load_balancers: vec![LoadBalancerEndpoint {
            target_group_arn: "arn:tg/web".to_string(),
            load_balancer_name: Some("web-lb".to_string()),
            container_name: "app".to_string(),
            container_port: 8080,
        }],
    }
}

pub fn unstable_status(desired: u32, running: u32, pending: u32) -> ServiceStatus {
    ServiceStatus {
        service_name: "web".to_string(),
        lifecycle: LifecycleState::Active,
        desired_count: desired,
        running_count: running,
        pending_count: pending,
        load_balancers: vec![],
    }
}

// =============================================================================
// Build
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildCalls {
    pub check_environment: usize,
    pub build: usize,
    pub compose_up: usize,
    pub compose_down: usize,
    pub health_check: usize,
}

#[derive(Default)]
pub struct FakeBuild {
    missing_toolchain: bool,
    fail_build: bool,
    fail_compose_up: bool,
    unhealthy: bool,
    check_environment: AtomicUsize,
    build: AtomicUsize,
    compose_up: AtomicUsize,
    compose_down: AtomicUsize,
    health_check: AtomicUsize,
}

impl FakeBuild {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn missing_toolchain(mut self) -> Self {
        self.missing_toolchain = true;
        self
    }

    pub fn failing_build(mut self) -> Self {
        self.fail_build = true;
        self
    }

    pub fn failing_compose_up(mut self) -> Self {
        self.fail_compose_up = true;
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.unhealthy = true;
        self
    }

    pub fn calls(&self) -> BuildCalls {
        BuildCalls {
            check_environment: read(&self.check_environment),
            build: read(&self.build),
            compose_up: read(&self.compose_up),
            compose_down: read(&self.compose_down),
            health_check: read(&self.health_check),
        }
    }
}

#[async_trait]
impl BuildBackend for FakeBuild {
    async fn check_environment(&self, _cancel: &CancellationToken) -> Result<()> {
        bump(&self.check_environment);
        if self.missing_toolchain {
            return Err(PipelineError::ToolchainMissing("docker".to_string()));
        }
        Ok(())
    }

    async fn build(&self, spec: &BuildSpec, _cancel: &CancellationToken) -> Result<String> {
        bump(&self.build);
        if self.fail_build {
            return Err(PipelineError::Process {
                program: "docker".to_string(),
                exit_code: 1,
                stderr: "build failed".to_string(),
            });
        }
        Ok(spec.local_image())
    }

    async fn compose_up(&self, _spec: &BuildSpec, _cancel: &CancellationToken) -> Result<()> {
        bump(&self.compose_up);
        if self.fail_compose_up {
            return Err(PipelineError::Process {
                program: "docker".to_string(),
                exit_code: 1,
                stderr: "port already allocated".to_string(),
            });
        }
        Ok(())
    }

    async fn compose_down(&self, _spec: &BuildSpec, _cancel: &CancellationToken) -> Result<()> {
        bump(&self.compose_down);
        Ok(())
    }

    async fn health_check(&self, _url: &str) -> Result<bool> {
        bump(&self.health_check);
        Ok(!self.unhealthy)
    }
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryCalls {
    pub ensure_repository: usize,
    pub push: usize,
}

#[derive(Default)]
pub struct FakeRegistry {
    fail_push: bool,
    ensure_repository: AtomicUsize,
    push: AtomicUsize,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_push(mut self) -> Self {
        self.fail_push = true;
        self
    }

    pub fn calls(&self) -> RegistryCalls {
        RegistryCalls {
            ensure_repository: read(&self.ensure_repository),
            push: read(&self.push),
        }
    }
}

#[async_trait]
impl RegistryBackend for FakeRegistry {
    async fn ensure_repository(&self, name: &str) -> Result<String> {
        bump(&self.ensure_repository);
        Ok(format!("123456789012.dkr.example.com/{name}"))
    }

    async fn push(
        &self,
        _local_image: &str,
        repository_uri: &str,
        tag: &str,
        _cancel: &CancellationToken,
    ) -> Result<String> {
        bump(&self.push);
        if self.fail_push {
            return Err(PipelineError::Process {
                program: "docker".to_string(),
                exit_code: 1,
                stderr: "denied: not authorized".to_string(),
            });
        }
        Ok(format!("{repository_uri}:{tag}"))
    }
}

// =============================================================================
// Control plane
// =============================================================================

/// One scripted answer to a status fetch
pub enum StatusScript {
    Status(ServiceStatus),
    Error(PipelineError),
    Missing,
    /// Answered forever once reached
    Repeat(ServiceStatus),
}

/// Stored desired state, keyed by resource name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeState {
    pub clusters: BTreeMap<String, DeploymentSpec>,
    pub workloads: BTreeMap<String, DeploymentSpec>,
    pub services: BTreeMap<String, DeploymentSpec>,
    /// Latest registered revision per family
    pub revisions: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterCalls {
    pub check_connectivity: usize,
    pub find_cluster: usize,
    pub create_cluster: usize,
    pub update_cluster: usize,
    pub find_workload: usize,
    pub register_workload: usize,
    pub update_workload: usize,
    pub find_service: usize,
    pub create_service: usize,
    pub update_service: usize,
    pub service_status: usize,
}

#[derive(Default)]
struct ClusterInner {
    state: FakeState,
    calls: ClusterCalls,
    script: VecDeque<StatusScript>,
    lookup_error: Option<fn() -> PipelineError>,
    status_delay: Duration,
    unreachable: bool,
    reject_service: bool,
}

#[derive(Default)]
pub struct FakeCluster {
    inner: Mutex<ClusterInner>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> ClusterCalls {
        self.inner.lock().unwrap().calls
    }

    pub fn snapshot(&self) -> FakeState {
        self.inner.lock().unwrap().state.clone()
    }

    pub fn workload_revision(&self, family: &str) -> Option<u32> {
        self.inner.lock().unwrap().state.revisions.get(family).copied()
    }

    pub fn stored_service(&self, name: &str) -> Option<DeploymentSpec> {
        self.inner.lock().unwrap().state.services.get(name).cloned()
    }

    /// Makes every lookup fail with the produced error
    pub fn fail_lookups_with(&self, make: fn() -> PipelineError) {
        self.inner.lock().unwrap().lookup_error = Some(make);
    }

    pub fn script_status(&self, script: Vec<StatusScript>) {
        self.inner.lock().unwrap().script = script.into();
    }

    /// Delays every status fetch
    pub fn set_status_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().status_delay = delay;
    }

    pub fn unreachable(&self) {
        self.inner.lock().unwrap().unreachable = true;
    }

    pub fn reject_service(&self) {
        self.inner.lock().unwrap().reject_service = true;
    }

    fn lookup_failure(&self) -> Option<PipelineError> {
        self.inner.lock().unwrap().lookup_error.map(|make| make())
    }
}

#[async_trait]
impl ClusterBackend for FakeCluster {
    async fn check_connectivity(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.check_connectivity += 1;
        if inner.unreachable {
            return Err(PipelineError::Transient("connection refused".to_string()));
        }
        Ok(())
    }

    async fn find_cluster(&self, name: &str) -> Result<Option<ResourceHandle>> {
        if let Some(e) = self.lookup_failure() {
            return Err(e);
        }
        let mut inner = self.inner.lock().unwrap();
        inner.calls.find_cluster += 1;
        Ok(inner
            .state
            .clusters
            .contains_key(name)
            .then(|| ResourceHandle::new(format!("arn:cluster/{name}"))))
    }

    async fn create_cluster(&self, spec: &DeploymentSpec) -> Result<ResourceHandle> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.create_cluster += 1;
        inner
            .state
            .clusters
            .insert(spec.cluster_name.clone(), spec.clone());
        Ok(ResourceHandle::new(format!("arn:cluster/{}", spec.cluster_name)))
    }

    async fn update_cluster(&self, spec: &DeploymentSpec) -> Result<ResourceHandle> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.update_cluster += 1;
        inner
            .state
            .clusters
            .insert(spec.cluster_name.clone(), spec.clone());
        Ok(ResourceHandle::new(format!("arn:cluster/{}", spec.cluster_name)))
    }

    async fn find_workload(&self, family: &str) -> Result<Option<ResourceHandle>> {
        if let Some(e) = self.lookup_failure() {
            return Err(e);
        }
        let mut inner = self.inner.lock().unwrap();
        inner.calls.find_workload += 1;
        Ok(inner
            .state
            .workloads
            .contains_key(family)
            .then(|| ResourceHandle::new(format!("arn:task-definition/{family}"))))
    }

    async fn register_workload(&self, spec: &DeploymentSpec) -> Result<ResourceHandle> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.register_workload += 1;
        inner
            .state
            .workloads
            .insert(spec.task_family.clone(), spec.clone());
        *inner
            .state
            .revisions
            .entry(spec.task_family.clone())
            .or_default() += 1;
        Ok(ResourceHandle::new(format!(
            "arn:task-definition/{}",
            spec.task_family
        )))
    }

    async fn update_workload(&self, spec: &DeploymentSpec) -> Result<ResourceHandle> {
        let unchanged = {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.update_workload += 1;
            inner
                .state
                .workloads
                .get(&spec.task_family)
                .is_some_and(|current| {
                    RegisterWorkload::from(current) == RegisterWorkload::from(spec)
                })
        };
        if unchanged {
            return Ok(ResourceHandle::new(format!(
                "arn:task-definition/{}",
                spec.task_family
            )));
        }
        self.register_workload(spec).await
    }

    async fn find_service(&self, cluster: &str, service: &str) -> Result<Option<ResourceHandle>> {
        if let Some(e) = self.lookup_failure() {
            return Err(e);
        }
        let mut inner = self.inner.lock().unwrap();
        inner.calls.find_service += 1;
        Ok(inner
            .state
            .services
            .contains_key(service)
            .then(|| ResourceHandle::new(format!("arn:service/{cluster}/{service}"))))
    }

    async fn create_service(&self, spec: &DeploymentSpec) -> Result<ResourceHandle> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.create_service += 1;
        if inner.reject_service {
            return Err(PipelineError::Reconcile {
                kind: shipyard_core::domain::resource::ResourceKind::Service,
                name: spec.service_name.clone(),
                message: "invalid subnet".to_string(),
            });
        }
        inner
            .state
            .services
            .insert(spec.service_name.clone(), spec.clone());
        Ok(ResourceHandle::new(format!(
            "arn:service/{}/{}",
            spec.cluster_name, spec.service_name
        )))
    }

    async fn update_service(&self, spec: &DeploymentSpec) -> Result<ResourceHandle> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.update_service += 1;
        inner
            .state
            .services
            .insert(spec.service_name.clone(), spec.clone());
        Ok(ResourceHandle::new(format!(
            "arn:service/{}/{}",
            spec.cluster_name, spec.service_name
        )))
    }

    async fn service_status(&self, _cluster: &str, service: &str) -> Result<Option<ServiceStatus>> {
        let delay = {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.service_status += 1;
            inner.status_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock().unwrap();
        match inner.script.pop_front() {
            Some(StatusScript::Status(status)) => Ok(Some(status)),
            Some(StatusScript::Error(e)) => Err(e),
            Some(StatusScript::Missing) => Ok(None),
            Some(StatusScript::Repeat(status)) => {
                inner.script.push_front(StatusScript::Repeat(status.clone()));
                Ok(Some(status))
            }
            // Unscripted: whatever is stored has converged
            None => Ok(inner
                .state
                .services
                .get(service)
                .map(|spec| stable_status(spec.desired_count))),
        }
    }
}

// =============================================================================
// Installer
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallerCalls {
    pub check_toolchain: usize,
    pub generate_script: usize,
    pub compile: usize,
    pub sign: usize,
}

#[derive(Default)]
pub struct FakeInstaller {
    missing_toolchain: bool,
    fail_compile: bool,
    fail_sign: bool,
    check_toolchain: AtomicUsize,
    generate_script: AtomicUsize,
    compile: AtomicUsize,
    sign: AtomicUsize,
}

impl FakeInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn missing_toolchain(mut self) -> Self {
        self.missing_toolchain = true;
        self
    }

    pub fn failing_compile(mut self) -> Self {
        self.fail_compile = true;
        self
    }

    pub fn failing_sign(mut self) -> Self {
        self.fail_sign = true;
        self
    }

    pub fn calls(&self) -> InstallerCalls {
        InstallerCalls {
            check_toolchain: read(&self.check_toolchain),
            generate_script: read(&self.generate_script),
            compile: read(&self.compile),
            sign: read(&self.sign),
        }
    }
}

#[async_trait]
impl InstallerBackend for FakeInstaller {
    async fn check_toolchain(&self, _cancel: &CancellationToken) -> bool {
        bump(&self.check_toolchain);
        !self.missing_toolchain
    }

    fn generate_script(&self, spec: &InstallerSpec) -> String {
        bump(&self.generate_script);
        format!("[Setup]\nAppName={}\n", spec.app_name)
    }

    async fn compile(
        &self,
        spec: &InstallerSpec,
        _script: &str,
        _cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        bump(&self.compile);
        if self.fail_compile {
            return Err(PipelineError::Process {
                program: "ISCC.exe".to_string(),
                exit_code: 2,
                stderr: "Error on line 12".to_string(),
            });
        }
        Ok(spec
            .output_dir
            .join(format!("{}.exe", spec.output_base_filename)))
    }

    async fn sign(
        &self,
        binary: &Path,
        _certificate: &Path,
        _password: &str,
        _cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        bump(&self.sign);
        if self.fail_sign {
            return Err(PipelineError::Process {
                program: "signtool.exe".to_string(),
                exit_code: 1,
                stderr: "certificate expired".to_string(),
            });
        }
        Ok(binary.to_path_buf())
    }
}

// =============================================================================
// Wiring
// =============================================================================

/// All four fakes, kept typed so tests can read their counters
pub struct Fakes {
    pub build: Arc<FakeBuild>,
    pub registry: Arc<FakeRegistry>,
    pub cluster: Arc<FakeCluster>,
    pub installer: Arc<FakeInstaller>,
}

impl Fakes {
    pub fn new() -> Self {
        Self::with(
            FakeBuild::new(),
            FakeRegistry::new(),
            FakeCluster::new(),
            FakeInstaller::new(),
        )
    }

    pub fn with(
        build: FakeBuild,
        registry: FakeRegistry,
        cluster: FakeCluster,
        installer: FakeInstaller,
    ) -> Self {
        Self {
            build: Arc::new(build),
            registry: Arc::new(registry),
            cluster: Arc::new(cluster),
            installer: Arc::new(installer),
        }
    }

    pub fn backends(&self) -> Backends {
        Backends {
            build: self.build.clone(),
            registry: self.registry.clone(),
            cluster: self.cluster.clone(),
            installer: self.installer.clone(),
        }
    }

    pub fn context(&self, settings: RunSettings) -> PipelineContext {
        self.context_with_cancel(settings, CancellationToken::new())
    }

    pub fn context_with_cancel(
        &self,
        settings: RunSettings,
        cancel: CancellationToken,
    ) -> PipelineContext {
        PipelineContext::new(
            self.backends(),
            build_spec(),
            deployment_spec(),
            InstallerSpec::default(),
            settings,
            cancel,
        )
    }
}
