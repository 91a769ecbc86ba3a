//! `shipyard installer-script`

use std::path::Path;

use anyhow::{Context, Result};
use colored::*;
use shipyard_runner::{Config, installer_script};

/// Renders the installer script from the configuration
///
/// Only the file is loaded; no connectivity or deployment settings are
/// validated because nothing is deployed.
pub fn print_script(config_path: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let mut config = Config::load(config_path)?;
    config.apply_env();
    let script = installer_script::render(&config.installer_spec());

    match output {
        Some(path) => {
            std::fs::write(path, &script)
                .with_context(|| format!("Failed to write installer script to {:?}", path))?;
            println!("  {} {}", "Created".green(), path.display());
        }
        None => print!("{script}"),
    }

    Ok(())
}
