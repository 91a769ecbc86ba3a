//! Shipyard CLI
//!
//! Runs the build → publish → deploy → package pipeline and offers a few
//! helpers around it.

mod commands;
mod config;

use std::process::ExitCode;

use clap::Parser;
use colored::*;
use commands::{Commands, handle_command};
use config::GlobalArgs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "shipyard")]
#[command(about = "Container build, deploy and installer packaging pipeline", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shipyard_runner=info,shipyard_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match handle_command(cli.command, &cli.global).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "shipyard",
            "--config",
            "ci/shipyard.toml",
            "run",
            "--skip-installer",
            "--cluster",
            "prod",
        ])
        .unwrap();

        assert_eq!(
            cli.global.config.as_deref(),
            Some(std::path::Path::new("ci/shipyard.toml"))
        );
        match cli.command {
            Commands::Run(args) => {
                assert!(args.skip_installer);
                assert!(!args.skip_verify);
                assert_eq!(args.overrides.cluster.as_deref(), Some("prod"));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_prune_flags() {
        let cli = Cli::try_parse_from(["shipyard", "prune", "--volumes", "-y"]).unwrap();

        match cli.command {
            Commands::Prune {
                stop,
                images,
                volumes,
                yes,
            } => {
                assert!(!stop);
                assert!(!images);
                assert!(volumes);
                assert!(yes);
            }
            _ => panic!("expected prune"),
        }
    }
}
