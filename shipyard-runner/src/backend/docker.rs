//! Docker CLI build backend
//!
//! Drives `docker` and compose as external processes. Compose is used
//! either as the `docker compose` plugin or the standalone `docker-compose`
//! binary, whichever answers first. Host housekeeping (listing containers,
//! pruning unused resources) lives here too.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use shipyard_core::domain::build::BuildSpec;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::BuildBackend;
use crate::error::{PipelineError, Result};
use crate::process::ProcessCommand;

const COMPOSE_UP_TIMEOUT: Duration = Duration::from_secs(300);
const COMPOSE_DOWN_TIMEOUT: Duration = Duration::from_secs(180);
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);
const HOUSEKEEPING_TIMEOUT: Duration = Duration::from_secs(120);

/// Tab separated so that values with spaces survive
const PS_FORMAT: &str = "{{.ID}}\t{{.Names}}\t{{.Image}}\t{{.Command}}\t{{.State}}\t{{.Status}}\t{{.Ports}}\t{{.CreatedAt}}";

/// How compose is invoked on this host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeFlavor {
    /// `docker compose ...`
    Plugin,
    /// `docker-compose ...`
    Standalone,
}

impl ComposeFlavor {
    fn command(&self) -> ProcessCommand {
        match self {
            ComposeFlavor::Plugin => ProcessCommand::new("docker").arg("compose"),
            ComposeFlavor::Standalone => ProcessCommand::new("docker-compose"),
        }
    }
}

/// One row of `docker ps`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub command: String,
    pub state: String,
    pub status: String,
    pub ports: String,
    pub created: String,
}

impl ContainerSummary {
    /// Parses one line printed with [`PS_FORMAT`]
    fn parse(line: &str) -> Option<Self> {
        let mut fields = line.splitn(8, '\t').map(str::trim);
        let mut next = || fields.next().map(str::to_string);
        let summary = Self {
            id: next()?,
            name: next()?,
            image: next()?,
            command: next()?.trim_matches('"').to_string(),
            state: next()?,
            status: next()?,
            ports: next()?,
            created: next()?,
        };
        (!summary.id.is_empty()).then_some(summary)
    }

    pub fn short_id(&self) -> &str {
        self.id.get(..12).unwrap_or(&self.id)
    }
}

impl fmt::Display for ContainerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) - {} - {}", self.name, self.short_id(), self.state, self.image)
    }
}

/// What a host cleanup removes beyond stopped containers, unused networks
/// and dangling images
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupOptions {
    /// Stop running containers first so they are pruned too
    pub stop_running: bool,
    /// Remove every image not used by a container
    pub remove_images: bool,
    pub remove_volumes: bool,
}

/// [`BuildBackend`] over the docker command line
pub struct DockerCli {
    http: reqwest::Client,
}

impl DockerCli {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(HEALTH_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Finds a working compose, preferring the standalone binary
    pub async fn detect_compose(&self, cancel: &CancellationToken) -> Result<ComposeFlavor> {
        let standalone = ProcessCommand::new("docker-compose")
            .arg("--version")
            .timeout(PROBE_TIMEOUT)
            .run(cancel)
            .await;
        match standalone {
            Ok(output) if output.success() => return Ok(ComposeFlavor::Standalone),
            Err(PipelineError::Cancelled) => return Err(PipelineError::Cancelled),
            _ => {}
        }

        let plugin = ProcessCommand::new("docker")
            .args(["compose", "version"])
            .timeout(PROBE_TIMEOUT)
            .run(cancel)
            .await?;
        if plugin.success() {
            return Ok(ComposeFlavor::Plugin);
        }

        Err(PipelineError::ToolchainMissing(
            "docker compose (plugin or docker-compose)".to_string(),
        ))
    }

    /// Assembles `docker build` arguments for `spec`
    fn build_command(spec: &BuildSpec) -> ProcessCommand {
        let mut cmd = ProcessCommand::new("docker")
            .arg("build")
            .arg("-f")
            .arg(spec.dockerfile.as_os_str())
            .arg("-t")
            .arg(spec.local_image());

        if !spec.platforms.is_empty() {
            cmd = cmd.arg("--platform").arg(spec.platforms.join(","));
        }
        for (key, value) in &spec.build_args {
            cmd = cmd.arg("--build-arg").arg(format!("{key}={value}"));
        }

        cmd.arg(spec.context.as_os_str())
            .timeout(Duration::from_secs(spec.timeout_secs))
            .echo_output()
    }

    /// Lists containers on this host; stopped ones only with `all`
    pub async fn list_containers(
        &self,
        all: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<ContainerSummary>> {
        let mut cmd = ProcessCommand::new("docker").arg("ps");
        if all {
            cmd = cmd.arg("-a");
        }
        let output = cmd
            .args(["--no-trunc", "--format", PS_FORMAT])
            .timeout(PROBE_TIMEOUT)
            .run_checked(cancel)
            .await?;

        let containers: Vec<_> = output
            .stdout
            .iter()
            .filter_map(|line| ContainerSummary::parse(line))
            .collect();
        debug!(count = containers.len(), all, "listed containers");
        Ok(containers)
    }

    fn prune_command(options: CleanupOptions) -> ProcessCommand {
        let mut cmd = ProcessCommand::new("docker").args(["system", "prune", "--force"]);
        if options.remove_images {
            cmd = cmd.arg("--all");
        }
        if options.remove_volumes {
            cmd = cmd.arg("--volumes");
        }
        cmd.timeout(HOUSEKEEPING_TIMEOUT)
    }

    /// Removes stopped containers, unused networks and dangling images
    ///
    /// Returns docker's summary of reclaimed space.
    pub async fn cleanup_system(
        &self,
        options: CleanupOptions,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if options.stop_running {
            let running: Vec<String> = self
                .list_containers(false, cancel)
                .await?
                .into_iter()
                .map(|c| c.id)
                .collect();
            if !running.is_empty() {
                info!(count = running.len(), "stopping running containers");
                ProcessCommand::new("docker")
                    .arg("stop")
                    .args(&running)
                    .timeout(HOUSEKEEPING_TIMEOUT)
                    .run_checked(cancel)
                    .await?;
            }
        }

        info!(
            remove_images = options.remove_images,
            remove_volumes = options.remove_volumes,
            "pruning docker resources"
        );
        let output = Self::prune_command(options).run_checked(cancel).await?;
        let summary = output
            .stdout
            .iter()
            .rev()
            .find(|line| line.starts_with("Total reclaimed space"))
            .cloned()
            .unwrap_or_else(|| "nothing to reclaim".to_string());
        info!("{}", summary);
        Ok(summary)
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BuildBackend for DockerCli {
    async fn check_environment(&self, cancel: &CancellationToken) -> Result<()> {
        let version = ProcessCommand::new("docker")
            .arg("--version")
            .timeout(PROBE_TIMEOUT)
            .run_checked(cancel)
            .await?;
        info!("Docker is available: {}", version.stdout_text().trim());

        // The client alone is not enough; the daemon must answer
        ProcessCommand::new("docker")
            .args(["info", "--format", "{{.ServerVersion}}"])
            .timeout(PROBE_TIMEOUT)
            .run_checked(cancel)
            .await
            .map_err(|e| match e {
                PipelineError::Process { stderr, .. } => {
                    PipelineError::ToolchainMissing(format!("docker daemon: {stderr}"))
                }
                other => other,
            })?;

        let compose = self.detect_compose(cancel).await?;
        debug!("using compose flavor {:?}", compose);
        Ok(())
    }

    async fn build(&self, spec: &BuildSpec, cancel: &CancellationToken) -> Result<String> {
        if !spec.dockerfile.exists() {
            return Err(PipelineError::MissingFile(spec.dockerfile.clone()));
        }

        let image = spec.local_image();
        info!(image = %image, dockerfile = %spec.dockerfile.display(), "building image");

        Self::build_command(spec).run_checked(cancel).await?;

        info!(image = %image, "image built");
        Ok(image)
    }

    async fn compose_up(&self, spec: &BuildSpec, cancel: &CancellationToken) -> Result<()> {
        if !spec.compose_file.exists() {
            return Err(PipelineError::MissingFile(spec.compose_file.clone()));
        }

        let flavor = self.detect_compose(cancel).await?;
        let mut cmd = flavor
            .command()
            .arg("-f")
            .arg(spec.compose_file.as_os_str())
            .arg("-p")
            .arg(spec.repository_name())
            .args(["up", "-d"])
            .echo_output();
        if spec.pull_on_up {
            cmd = cmd.args(["--pull", "always"]);
        }

        info!(compose_file = %spec.compose_file.display(), "starting local environment");
        cmd.timeout(COMPOSE_UP_TIMEOUT).run_checked(cancel).await?;
        Ok(())
    }

    async fn compose_down(&self, spec: &BuildSpec, cancel: &CancellationToken) -> Result<()> {
        let flavor = self.detect_compose(cancel).await?;

        info!(compose_file = %spec.compose_file.display(), "stopping local environment");
        flavor
            .command()
            .arg("-f")
            .arg(spec.compose_file.as_os_str())
            .arg("-p")
            .arg(spec.repository_name())
            .args(["down", "-v"])
            .timeout(COMPOSE_DOWN_TIMEOUT)
            .run_checked(cancel)
            .await?;
        Ok(())
    }

    async fn health_check(&self, url: &str) -> Result<bool> {
        match self.http.get(url).send().await {
            Ok(response) => {
                debug!(url, status = response.status().as_u16(), "health probe answered");
                Ok(response.status().is_success())
            }
            Err(e) => {
                warn!(url, "health probe failed: {}", e);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn spec() -> BuildSpec {
        let mut build_args = BTreeMap::new();
        build_args.insert("VERSION".to_string(), "1.2.3".to_string());
        build_args.insert("BUILD_NUMBER".to_string(), "42".to_string());

        BuildSpec {
            project_name: "Web".to_string(),
            dockerfile: PathBuf::from("/definitely/missing/Dockerfile"),
            compose_file: PathBuf::from("/definitely/missing/docker-compose.yml"),
            context: PathBuf::from("."),
            tag: "latest".to_string(),
            build_args,
            platforms: vec!["linux/amd64".to_string()],
            timeout_secs: 600,
            pull_on_up: true,
        }
    }

    #[tokio::test]
    async fn test_build_requires_dockerfile() {
        let err = DockerCli::new()
            .build(&spec(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingFile(_)));
    }

    #[tokio::test]
    async fn test_compose_up_requires_compose_file() {
        let err = DockerCli::new()
            .compose_up(&spec(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingFile(_)));
    }

    #[test]
    fn test_build_command_arguments() {
        let cmd = format!("{:?}", DockerCli::build_command(&spec()));
        assert!(cmd.contains("\"web:latest\""));
        assert!(cmd.contains("\"linux/amd64\""));
        assert!(cmd.contains("\"BUILD_NUMBER=42\""));
        assert!(cmd.contains("\"VERSION=1.2.3\""));
        // Build progress is shown at the default log level
        assert!(cmd.contains("echo: true"));
    }

    #[test]
    fn test_parse_container_line() {
        let line = "4f1c2a9b7d3e5f60718293a4b5c6d7e8f9a0b1c2d3e4f5a6b7c8d9e0f1a2b3c4\tweb-app-1\tweb:latest\t\"dotnet Web.dll\"\trunning\tUp 5 minutes\t0.0.0.0:8080->8080/tcp\t2026-10-01 12:00:00 +0000 UTC";

        let container = ContainerSummary::parse(line).unwrap();

        assert_eq!(container.name, "web-app-1");
        assert_eq!(container.command, "dotnet Web.dll");
        assert_eq!(container.state, "running");
        assert_eq!(container.ports, "0.0.0.0:8080->8080/tcp");
        assert_eq!(
            container.to_string(),
            "web-app-1 (4f1c2a9b7d3e) - running - web:latest"
        );
    }

    #[test]
    fn test_parse_container_line_without_ports() {
        let line = "abc123\tdb\tpostgres:16\t\"docker-entrypoint.s…\"\texited\tExited (0) 2 hours ago\t\t2026-10-01 11:00:00 +0000 UTC";

        let container = ContainerSummary::parse(line).unwrap();

        assert_eq!(container.short_id(), "abc123");
        assert_eq!(container.ports, "");
        assert_eq!(container.created, "2026-10-01 11:00:00 +0000 UTC");
    }

    #[test]
    fn test_parse_rejects_short_lines() {
        assert!(ContainerSummary::parse("").is_none());
        assert!(ContainerSummary::parse("abc123\tweb").is_none());
    }

    #[test]
    fn test_prune_command_arguments() {
        let plain = DockerCli::prune_command(CleanupOptions::default()).display_args();
        assert_eq!(plain, vec!["system", "prune", "--force"]);

        let everything = DockerCli::prune_command(CleanupOptions {
            stop_running: true,
            remove_images: true,
            remove_volumes: true,
        })
        .display_args();
        assert_eq!(everything, vec!["system", "prune", "--force", "--all", "--volumes"]);
    }
}
