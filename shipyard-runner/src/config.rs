//! Pipeline configuration
//!
//! Loaded from `shipyard.toml`, then overridden by environment variables,
//! then by command line flags. Every field has a default so an empty file
//! is a valid configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use shipyard_client::ControlPlaneClient;
use shipyard_core::domain::build::BuildSpec;
use shipyard_core::domain::deployment::{
    AutoScaling, DeploymentSpec, EnvVar, LoadBalancerBinding, NetworkPlacement, RolloutPolicy,
};
use shipyard_core::domain::installer::InstallerSpec;

use crate::backend::{ControlPlane, DockerCli, ImageRegistry, InnoSetup, InnoSetupConfig};
use crate::context::{
    Backends, RegistryTarget, RunSettings, SigningSettings, VerifySettings, WatchSettings,
};

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "shipyard.toml";

/// Full pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Control plane and registry API base URL
    pub endpoint: String,
    pub region: String,
    pub build: BuildConfig,
    pub registry: RegistryConfig,
    pub deploy: DeployConfig,
    pub verify: VerifyConfig,
    pub installer: InstallerConfig,
    pub watch: WatchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4566".to_string(),
            region: "us-east-1".to_string(),
            build: BuildConfig::default(),
            registry: RegistryConfig::default(),
            deploy: DeployConfig::default(),
            verify: VerifyConfig::default(),
            installer: InstallerConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub project_name: String,
    pub dockerfile: PathBuf,
    pub compose_file: PathBuf,
    pub context: PathBuf,
    pub tag: String,
    /// Extra build args; VERSION, BUILD_DATE and BUILD_NUMBER are filled in
    /// when absent
    pub build_args: BTreeMap<String, String>,
    pub build_number: Option<String>,
    pub platforms: Vec<String>,
    pub timeout_secs: u64,
    pub pull_on_up: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            project_name: "my-project".to_string(),
            dockerfile: PathBuf::from("./Dockerfile"),
            compose_file: PathBuf::from("./docker-compose.yml"),
            context: PathBuf::from("."),
            tag: "latest".to_string(),
            build_args: BTreeMap::new(),
            build_number: None,
            platforms: vec!["linux/amd64".to_string()],
            timeout_secs: 600,
            pull_on_up: false,
        }
    }
}

/// Registry target; both fields fall back to the build settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub repository: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub cluster: String,
    pub service: String,
    pub task_family: String,
    pub container_name: String,
    /// Image to roll out when nothing is published in the same run
    pub image: Option<String>,
    pub desired_count: u32,
    pub cpu: u32,
    pub memory: u32,
    pub ports: Vec<u16>,
    /// `KEY=VALUE` entries
    pub environment: Vec<String>,
    pub subnets: Vec<String>,
    pub security_group: Option<String>,
    pub assign_public_ip: bool,
    pub execution_role_arn: Option<String>,
    pub task_role_arn: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub rollout: RolloutPolicy,
    pub autoscaling: AutoScalingConfig,
    pub load_balancer: LoadBalancerConfig,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            cluster: "default-cluster".to_string(),
            service: "my-service".to_string(),
            task_family: "my-task".to_string(),
            container_name: "app".to_string(),
            image: None,
            desired_count: 1,
            cpu: 256,
            memory: 512,
            ports: vec![80],
            environment: Vec::new(),
            subnets: Vec::new(),
            security_group: None,
            assign_public_ip: true,
            execution_role_arn: None,
            task_role_arn: None,
            tags: BTreeMap::new(),
            rollout: RolloutPolicy::default(),
            autoscaling: AutoScalingConfig::default(),
            load_balancer: LoadBalancerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoScalingConfig {
    pub enabled: bool,
    pub min_capacity: u32,
    pub max_capacity: u32,
}

impl Default for AutoScalingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_capacity: 1,
            max_capacity: 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadBalancerConfig {
    pub enabled: bool,
    pub load_balancer_arn: String,
    pub target_group_arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub enabled: bool,
    pub required: bool,
    pub health_url: String,
    pub warmup_secs: u64,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            required: false,
            health_url: "http://localhost:80/health".to_string(),
            warmup_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    pub enabled: bool,
    pub compiler_path: Option<PathBuf>,
    pub sign_tool_path: Option<PathBuf>,
    pub timestamp_url: String,
    pub certificate_path: Option<PathBuf>,
    #[serde(skip_serializing)]
    pub certificate_password: Option<String>,
    #[serde(flatten)]
    pub spec: InstallerSpec,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            compiler_path: None,
            sign_tool_path: None,
            timestamp_url: InnoSetupConfig::default().timestamp_url,
            certificate_path: None,
            certificate_password: None,
            spec: InstallerSpec::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub poll_interval_secs: u64,
    pub error_backoff_secs: u64,
    pub timeout_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            error_backoff_secs: 5,
            timeout_secs: 600,
        }
    }
}

/// Valid Fargate memory sizes (MiB) for a CPU size (units)
fn fargate_memory_sizes(cpu: u32) -> Vec<u32> {
    match cpu {
        256 => vec![512, 1024, 2048],
        512 => (1..=4).map(|gb| gb * 1024).collect(),
        1024 => (2..=8).map(|gb| gb * 1024).collect(),
        2048 => (4..=16).map(|gb| gb * 1024).collect(),
        4096 => (8..=30).map(|gb| gb * 1024).collect(),
        _ => Vec::new(),
    }
}

impl Config {
    /// Loads the configuration file
    ///
    /// With no explicit path, `shipyard.toml` in the working directory is
    /// used if present and defaults otherwise. An explicit path must exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Contents written by `shipyard init`
    pub fn default_toml() -> anyhow::Result<String> {
        toml::to_string_pretty(&Self::default()).context("Failed to serialize default config")
    }

    /// Applies overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from a variable lookup
    ///
    /// Recognised variables:
    /// - SHIPYARD_ENDPOINT
    /// - SHIPYARD_REGION
    /// - SHIPYARD_CLUSTER
    /// - SHIPYARD_SERVICE
    /// - SHIPYARD_IMAGE_TAG
    /// - BUILD_NUMBER
    /// - INSTALLER_CERT_PATH
    /// - INSTALLER_CERT_PASSWORD
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(endpoint) = lookup("SHIPYARD_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(region) = lookup("SHIPYARD_REGION") {
            self.region = region;
        }
        if let Some(cluster) = lookup("SHIPYARD_CLUSTER") {
            self.deploy.cluster = cluster;
        }
        if let Some(service) = lookup("SHIPYARD_SERVICE") {
            self.deploy.service = service;
        }
        if let Some(tag) = lookup("SHIPYARD_IMAGE_TAG") {
            self.build.tag = tag;
        }
        if let Some(number) = lookup("BUILD_NUMBER") {
            self.build.build_number = Some(number);
        }
        if let Some(cert) = lookup("INSTALLER_CERT_PATH") {
            self.installer.certificate_path = Some(PathBuf::from(cert));
        }
        if let Some(password) = lookup("INSTALLER_CERT_PASSWORD") {
            self.installer.certificate_password = Some(password);
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.endpoint.is_empty() {
            anyhow::bail!("endpoint cannot be empty");
        }

        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            anyhow::bail!("endpoint must start with http:// or https://");
        }

        if self.build.project_name.is_empty() {
            anyhow::bail!("build.project_name cannot be empty");
        }

        let deploy = &self.deploy;
        if deploy.cluster.is_empty() {
            anyhow::bail!("deploy.cluster cannot be empty");
        }

        if deploy.service.is_empty() {
            anyhow::bail!("deploy.service cannot be empty");
        }

        if deploy.task_family.is_empty() || deploy.container_name.is_empty() {
            anyhow::bail!("deploy.task_family and deploy.container_name cannot be empty");
        }

        if deploy.cpu == 0 || deploy.memory == 0 {
            anyhow::bail!("deploy.cpu and deploy.memory must be greater than 0");
        }

        if !fargate_memory_sizes(deploy.cpu).contains(&deploy.memory) {
            anyhow::bail!(
                "deploy.cpu = {} with deploy.memory = {} is not a valid Fargate size",
                deploy.cpu,
                deploy.memory
            );
        }

        let scaling = &deploy.autoscaling;
        if scaling.enabled {
            if scaling.min_capacity > scaling.max_capacity {
                anyhow::bail!("deploy.autoscaling.min_capacity exceeds max_capacity");
            }
            if deploy.desired_count < scaling.min_capacity
                || deploy.desired_count > scaling.max_capacity
            {
                anyhow::bail!(
                    "deploy.desired_count = {} is outside autoscaling bounds {}..={}",
                    deploy.desired_count,
                    scaling.min_capacity,
                    scaling.max_capacity
                );
            }
        }

        if self.watch.poll_interval_secs == 0 {
            anyhow::bail!("watch.poll_interval_secs must be greater than 0");
        }

        if self.watch.error_backoff_secs > self.watch.poll_interval_secs {
            anyhow::bail!("watch.error_backoff_secs cannot exceed watch.poll_interval_secs");
        }

        if self.watch.timeout_secs == 0 {
            anyhow::bail!("watch.timeout_secs must be greater than 0");
        }

        Ok(())
    }

    pub fn build_spec(&self) -> BuildSpec {
        let build = &self.build;
        let mut build_args = build.build_args.clone();
        build_args
            .entry("VERSION".to_string())
            .or_insert_with(|| build.tag.clone());
        build_args
            .entry("BUILD_DATE".to_string())
            .or_insert_with(|| chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string());
        build_args
            .entry("BUILD_NUMBER".to_string())
            .or_insert_with(|| build.build_number.clone().unwrap_or_else(|| "local".to_string()));

        BuildSpec {
            project_name: build.project_name.clone(),
            dockerfile: build.dockerfile.clone(),
            compose_file: build.compose_file.clone(),
            context: build.context.clone(),
            tag: build.tag.clone(),
            build_args,
            platforms: build.platforms.clone(),
            timeout_secs: build.timeout_secs,
            pull_on_up: build.pull_on_up,
        }
    }

    pub fn deployment_spec(&self) -> DeploymentSpec {
        let deploy = &self.deploy;
        let load_balancer = (deploy.load_balancer.enabled
            && !deploy.load_balancer.load_balancer_arn.is_empty()
            && !deploy.load_balancer.target_group_arn.is_empty())
        .then(|| LoadBalancerBinding {
            load_balancer_arn: deploy.load_balancer.load_balancer_arn.clone(),
            target_group_arn: deploy.load_balancer.target_group_arn.clone(),
        });
        let autoscaling = deploy.autoscaling.enabled.then_some(AutoScaling {
            min_capacity: deploy.autoscaling.min_capacity,
            max_capacity: deploy.autoscaling.max_capacity,
        });

        DeploymentSpec {
            region: self.region.clone(),
            cluster_name: deploy.cluster.clone(),
            service_name: deploy.service.clone(),
            task_family: deploy.task_family.clone(),
            container_name: deploy.container_name.clone(),
            image_uri: deploy
                .image
                .clone()
                .unwrap_or_else(|| self.build_spec().local_image()),
            desired_count: deploy.desired_count,
            cpu: deploy.cpu,
            memory: deploy.memory,
            container_ports: deploy.ports.clone(),
            environment: deploy.environment.iter().map(|raw| EnvVar::parse(raw)).collect(),
            network: NetworkPlacement {
                subnets: deploy.subnets.clone(),
                security_group: deploy.security_group.clone().filter(|sg| !sg.is_empty()),
                assign_public_ip: deploy.assign_public_ip,
            },
            load_balancer,
            tags: deploy.tags.clone(),
            execution_role_arn: deploy.execution_role_arn.clone(),
            task_role_arn: deploy.task_role_arn.clone(),
            rollout: deploy.rollout,
            autoscaling,
        }
    }

    pub fn installer_spec(&self) -> InstallerSpec {
        self.installer.spec.clone()
    }

    pub fn run_settings(&self) -> RunSettings {
        let build = self.build_spec();
        let signing = match (
            &self.installer.certificate_path,
            &self.installer.certificate_password,
        ) {
            (Some(certificate), Some(password)) => Some(SigningSettings {
                certificate: certificate.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        RunSettings {
            watch: WatchSettings {
                poll_interval: Duration::from_secs(self.watch.poll_interval_secs),
                error_backoff: Duration::from_secs(self.watch.error_backoff_secs),
                timeout: Duration::from_secs(self.watch.timeout_secs),
            },
            verify: VerifySettings {
                enabled: self.verify.enabled,
                required: self.verify.required,
                health_url: self.verify.health_url.clone(),
                warmup: Duration::from_secs(self.verify.warmup_secs),
            },
            registry: RegistryTarget {
                repository: self
                    .registry
                    .repository
                    .clone()
                    .unwrap_or_else(|| build.repository_name()),
                tag: self.registry.tag.clone().unwrap_or_else(|| build.tag.clone()),
            },
            signing,
            skip_installer: !self.installer.enabled,
        }
    }

    /// Production collaborators talking to the configured endpoint
    pub fn backends(&self) -> Backends {
        let client = ControlPlaneClient::new(self.endpoint.clone());
        let installer = InnoSetupConfig {
            compiler_path: self.installer.compiler_path.clone(),
            sign_tool_path: self.installer.sign_tool_path.clone(),
            timestamp_url: self.installer.timestamp_url.clone(),
        };

        Backends {
            build: Arc::new(DockerCli::new()),
            registry: Arc::new(ImageRegistry::new(client.clone())),
            cluster: Arc::new(ControlPlane::new(client)),
            installer: Arc::new(InnoSetup::new(installer)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.endpoint, "http://localhost:4566");
        assert_eq!(config.deploy.cluster, "default-cluster");
        assert_eq!(config.deploy.ports, vec![80]);
        assert_eq!(config.watch.poll_interval_secs, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            region = "eu-west-1"

            [deploy]
            service = "api"
            cpu = 1024
            memory = 4096
            environment = ["MODE=prod", "URL=http://x?a=b"]

            [deploy.rollout]
            minimum_healthy_percent = 50

            [installer]
            app_name = "Widget Studio"
            "#,
        )
        .unwrap();

        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.deploy.service, "api");
        assert_eq!(config.deploy.cluster, "default-cluster");
        assert_eq!(config.deploy.rollout.minimum_healthy_percent, 50);
        assert_eq!(config.deploy.rollout.maximum_percent, 200);
        assert_eq!(config.installer.spec.app_name, "Widget Studio");
        assert_eq!(config.installer.spec.output_base_filename, "MyApp_Setup");
        assert!(config.validate().is_ok());

        let spec = config.deployment_spec();
        assert_eq!(spec.region, "eu-west-1");
        assert_eq!(spec.environment[1].value, "http://x?a=b");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shipyard.toml");
        std::fs::write(&path, "[build]\nproject_name = \"Web\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.build.project_name, "Web");
        assert!(Config::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_default_toml_round_trips() {
        let raw = Config::default_toml().unwrap();
        assert_eq!(Config::from_toml(&raw).unwrap(), Config::default());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SHIPYARD_ENDPOINT", "https://cloud.example.com"),
            ("SHIPYARD_CLUSTER", "prod"),
            ("SHIPYARD_IMAGE_TAG", "1.4.2"),
            ("BUILD_NUMBER", "87"),
            ("SHIPYARD_SERVICE", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.endpoint, "https://cloud.example.com");
        assert_eq!(config.deploy.cluster, "prod");
        assert_eq!(config.deploy.service, "my-service");
        assert_eq!(config.build.tag, "1.4.2");

        let build = config.build_spec();
        assert_eq!(build.build_args.get("BUILD_NUMBER").map(String::as_str), Some("87"));
        assert_eq!(build.build_args.get("VERSION").map(String::as_str), Some("1.4.2"));
        assert!(build.build_args.contains_key("BUILD_DATE"));
    }

    #[test]
    fn test_explicit_build_args_win() {
        let mut config = Config::default();
        config
            .build
            .build_args
            .insert("VERSION".to_string(), "custom".to_string());

        let build = config.build_spec();
        assert_eq!(build.build_args.get("VERSION").map(String::as_str), Some("custom"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.endpoint = "localhost:4566".to_string();
        assert!(config.validate().is_err());
        config.endpoint = "http://localhost:4566".to_string();

        config.deploy.service = String::new();
        assert!(config.validate().is_err());
        config.deploy.service = "my-service".to_string();

        config.deploy.cpu = 0;
        assert!(config.validate().is_err());
        config.deploy.cpu = 256;

        config.watch.poll_interval_secs = 0;
        assert!(config.validate().is_err());
        config.watch.poll_interval_secs = 10;

        config.watch.error_backoff_secs = 11;
        assert!(config.validate().is_err());
        config.watch.error_backoff_secs = 5;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fargate_sizes() {
        let mut config = Config::default();

        config.deploy.cpu = 256;
        config.deploy.memory = 4096;
        assert!(config.validate().is_err());

        config.deploy.cpu = 1024;
        config.deploy.memory = 3072;
        assert!(config.validate().is_ok());

        config.deploy.cpu = 4096;
        config.deploy.memory = 30720;
        assert!(config.validate().is_ok());

        config.deploy.cpu = 300;
        config.deploy.memory = 512;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_desired_count_within_autoscaling_bounds() {
        let mut config = Config::default();
        config.deploy.autoscaling.enabled = true;
        config.deploy.desired_count = 5;
        assert!(config.validate().is_err());

        config.deploy.desired_count = 0;
        assert!(config.validate().is_err());

        config.deploy.desired_count = 2;
        assert!(config.validate().is_ok());
        assert_eq!(
            config.deployment_spec().autoscaling,
            Some(AutoScaling {
                min_capacity: 1,
                max_capacity: 3
            })
        );
    }

    #[test]
    fn test_load_balancer_requires_both_arns() {
        let mut config = Config::default();
        config.deploy.load_balancer.enabled = true;
        config.deploy.load_balancer.load_balancer_arn = "arn:lb".to_string();
        assert!(config.deployment_spec().load_balancer.is_none());

        config.deploy.load_balancer.target_group_arn = "arn:tg".to_string();
        assert!(config.deployment_spec().load_balancer.is_some());
    }

    #[test]
    fn test_run_settings() {
        let mut config = Config::default();
        config.build.project_name = "My-Project".to_string();

        let settings = config.run_settings();
        assert_eq!(settings.registry.repository, "my-project");
        assert_eq!(settings.registry.tag, "latest");
        assert_eq!(settings.watch.error_backoff, Duration::from_secs(5));
        assert!(settings.signing.is_none());
        assert!(!settings.skip_installer);

        config.installer.certificate_path = Some(PathBuf::from("cert.pfx"));
        assert!(config.run_settings().signing.is_none());

        config.installer.certificate_password = Some("secret".to_string());
        assert!(config.run_settings().signing.is_some());
    }

    #[test]
    fn test_deploy_image_defaults_to_local_build() {
        let mut config = Config::default();
        assert_eq!(config.deployment_spec().image_uri, "my-project:latest");

        config.deploy.image = Some("registry/app:9".to_string());
        assert_eq!(config.deployment_spec().image_uri, "registry/app:9");
    }
}
