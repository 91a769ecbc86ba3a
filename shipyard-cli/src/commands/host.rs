//! `shipyard containers` and `shipyard prune`

use anyhow::{Context, Result};
use colored::*;
use shipyard_runner::backend::DockerCli;
use shipyard_runner::backend::docker::{CleanupOptions, ContainerSummary};
use tokio_util::sync::CancellationToken;

pub async fn list_containers(all: bool, json: bool) -> Result<()> {
    let containers = DockerCli::new()
        .list_containers(all, &CancellationToken::new())
        .await
        .context("Failed to list containers")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&containers)?);
        return Ok(());
    }

    if containers.is_empty() {
        println!("{}", "No containers.".yellow());
        return Ok(());
    }
    for container in &containers {
        print_container(container);
    }
    Ok(())
}

fn print_container(container: &ContainerSummary) {
    let state = if container.state == "running" {
        container.state.green()
    } else {
        container.state.dimmed()
    };
    println!(
        "  {} {} {} {}",
        container.short_id().dimmed(),
        container.name.bold(),
        state,
        container.image.cyan()
    );
    if !container.ports.is_empty() {
        println!("      {}", container.ports.dimmed());
    }
}

/// Removes unused docker resources on this host
///
/// Refuses to run without `confirmed` since nothing removed can be restored.
pub async fn prune(options: CleanupOptions, confirmed: bool) -> Result<()> {
    if !confirmed {
        anyhow::bail!("prune removes docker resources permanently, pass --yes to proceed");
    }

    let summary = DockerCli::new()
        .cleanup_system(options, &CancellationToken::new())
        .await
        .context("Failed to clean up docker resources")?;

    println!("{} {}", "✓".green(), summary);
    Ok(())
}
