//! `shipyard init`

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use colored::*;
use shipyard_runner::Config;

/// Writes a configuration file holding every default
pub fn write_default_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists, pass --force to overwrite it",
            output.display()
        );
    }

    let content = Config::default_toml()?;
    fs::write(output, content)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", "✓ Configuration written!".green().bold());
    println!();
    println!("{}", "Next steps:".bold());
    println!("  1. Edit {} for your project", output.display().to_string().cyan());
    println!("  2. Run {} to build and deploy", "shipyard run".cyan());

    Ok(())
}
