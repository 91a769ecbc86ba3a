//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod host;
mod init;
mod installer;
mod run;
mod status;

pub use run::RunArgs;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;
use shipyard_runner::backend::docker::CleanupOptions;

use crate::config::{GlobalArgs, Overrides};

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline
    Run(RunArgs),
    /// Show the live status of the deployed service
    Status {
        #[command(flatten)]
        overrides: Overrides,

        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print or save the generated installer script
    InstallerScript {
        /// Write the script to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List docker containers on this host
    Containers {
        /// Include stopped containers
        #[arg(short, long)]
        all: bool,

        /// Print the containers as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove stopped containers, unused networks and dangling images
    Prune {
        /// Stop running containers first so they are removed too
        #[arg(long)]
        stop: bool,

        /// Also remove every image not used by a container
        #[arg(long)]
        images: bool,

        /// Also remove unused volumes
        #[arg(long)]
        volumes: bool,

        /// Confirm the removal
        #[arg(short, long)]
        yes: bool,
    },
    /// Write a default configuration file
    Init {
        /// Destination file
        #[arg(short, long, default_value = "shipyard.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Routes the command to its handler
///
/// Returns the process exit code; errors are reported by the caller.
pub async fn handle_command(command: Commands, global: &GlobalArgs) -> Result<ExitCode> {
    let config_path = global.config.as_deref();
    match command {
        Commands::Run(args) => run::run_pipeline(config_path, args).await,
        Commands::Status { overrides, json } => {
            status::show_status(config_path, &overrides, json).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::InstallerScript { output } => {
            installer::print_script(config_path, output.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Containers { all, json } => {
            host::list_containers(all, json).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Prune {
            stop,
            images,
            volumes,
            yes,
        } => {
            let options = CleanupOptions {
                stop_running: stop,
                remove_images: images,
                remove_volumes: volumes,
            };
            host::prune(options, yes).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Init { output, force } => {
            init::write_default_config(&output, force)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
