//! `shipyard run`

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use colored::*;
use shipyard_core::domain::stage::{PipelineResult, StageResult};
use shipyard_runner::{PipelineContext, PipelineOrchestrator};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Overrides, resolve};

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub overrides: Overrides,

    /// Skip the installer packaging stage
    #[arg(long)]
    pub skip_installer: bool,

    /// Skip local compose verification even if configured
    #[arg(long)]
    pub skip_verify: bool,

    /// Print the pipeline result as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run_pipeline(config_path: Option<&Path>, args: RunArgs) -> Result<ExitCode> {
    let config = resolve(config_path, &args.overrides)?;

    let mut settings = config.run_settings();
    settings.skip_installer |= args.skip_installer;
    if args.skip_verify {
        settings.verify.enabled = false;
    }

    let cancel = CancellationToken::new();
    let ctx = PipelineContext::new(
        config.backends(),
        config.build_spec(),
        config.deployment_spec(),
        config.installer_spec(),
        settings,
        cancel.clone(),
    );
    info!(
        run_id = %ctx.run_id,
        cluster = %ctx.deployment.cluster_name,
        service = %ctx.deployment.service_name,
        "starting pipeline"
    );

    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling pipeline");
            cancel.cancel();
        }
    });

    let result = PipelineOrchestrator::new().run(&ctx).await;
    interrupt.abort();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    Ok(ExitCode::from(result.exit_code() as u8))
}

fn print_result(result: &PipelineResult) {
    println!();
    for outcome in &result.outcomes {
        let marker = match outcome.result {
            StageResult::Success => "✓".green(),
            StageResult::SoftFail => "!".yellow(),
            StageResult::HardFail => "✗".red(),
        };
        println!(
            "  {} {:<20} {} {}",
            marker,
            outcome.stage.to_string().bold(),
            format!("{}s", outcome.duration_secs()).dimmed(),
            outcome.message
        );
    }
    println!();

    if result.success {
        let warnings = result.warnings().count();
        if warnings > 0 {
            println!(
                "{}",
                format!("✓ Pipeline succeeded with {} warning(s)", warnings)
                    .yellow()
                    .bold()
            );
        } else {
            println!("{}", "✓ Pipeline succeeded".green().bold());
        }
    } else {
        let stage = result
            .aborted_by()
            .map(|o| o.stage.to_string())
            .unwrap_or_else(|| "unknown stage".to_string());
        println!("{}", format!("✗ Pipeline failed at {}", stage).red().bold());
    }
    println!("  Run: {}", result.run_id.to_string().cyan());
    if let Some(image) = &result.published_image {
        println!("  Image: {}", image.cyan());
    }
    if let Some(installer) = &result.installer {
        println!("  Installer: {}", installer.display().to_string().cyan());
    }
}
