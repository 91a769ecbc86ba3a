//! `shipyard status`

use std::path::Path;

use anyhow::{Context, Result};
use colored::*;
use shipyard_core::domain::service::ServiceStatus;

use crate::config::{Overrides, resolve};

pub async fn show_status(config_path: Option<&Path>, overrides: &Overrides, json: bool) -> Result<()> {
    let config = resolve(config_path, overrides)?;
    let cluster = config.backends().cluster;

    let status = cluster
        .service_status(&config.deploy.cluster, &config.deploy.service)
        .await
        .context("Failed to fetch service status")?;

    let Some(status) = status else {
        println!(
            "{}",
            format!(
                "Service {} not found in cluster {}.",
                config.deploy.service, config.deploy.cluster
            )
            .yellow()
        );
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&status);
    }

    Ok(())
}

fn print_status(status: &ServiceStatus) {
    let state = if status.is_stable() {
        "stable".green()
    } else {
        "converging".yellow()
    };

    println!("{} {}", status.service_name.bold(), state);
    println!("  Lifecycle: {}", status.lifecycle.to_string().cyan());
    println!(
        "  Tasks:     {} running, {} pending, {} desired",
        status.running_count, status.pending_count, status.desired_count
    );
    for lb in &status.load_balancers {
        println!(
            "  Endpoint:  {} → {}:{}",
            lb.load_balancer_name
                .as_deref()
                .unwrap_or(&lb.target_group_arn)
                .dimmed(),
            lb.container_name,
            lb.container_port
        );
    }
}
