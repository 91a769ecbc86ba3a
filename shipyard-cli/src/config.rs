//! Configuration resolution
//!
//! Precedence, lowest first: defaults, `shipyard.toml`, environment
//! variables, command line flags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use shipyard_runner::Config;

/// Flags shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to the configuration file (default: ./shipyard.toml if present)
    #[arg(short, long, global = true, env = "SHIPYARD_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Flags that override individual configuration values
#[derive(Args, Debug, Clone, Default)]
pub struct Overrides {
    /// Control plane endpoint
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Cluster name
    #[arg(long)]
    pub cluster: Option<String>,

    /// Service name
    #[arg(long)]
    pub service: Option<String>,

    /// Image tag to build and publish
    #[arg(long)]
    pub tag: Option<String>,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(cluster) = &self.cluster {
            config.deploy.cluster = cluster.clone();
        }
        if let Some(service) = &self.service {
            config.deploy.service = service.clone();
        }
        if let Some(tag) = &self.tag {
            config.build.tag = tag.clone();
        }
    }
}

/// Loads, overrides and validates the configuration
pub fn resolve(path: Option<&Path>, overrides: &Overrides) -> Result<Config> {
    let mut config = Config::load(path)?;
    config.apply_env();
    overrides.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}
