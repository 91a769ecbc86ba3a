//! Container build domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// What the build stage produces and how
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    pub project_name: String,
    pub dockerfile: PathBuf,
    pub compose_file: PathBuf,
    pub context: PathBuf,
    /// Tag applied to the locally built image (e.g. "latest")
    pub tag: String,
    pub build_args: BTreeMap<String, String>,
    pub platforms: Vec<String>,
    pub timeout_secs: u64,
    /// Pass `--pull always` when starting the local compose environment
    pub pull_on_up: bool,
}

impl BuildSpec {
    /// Local image reference, e.g. `my-project:latest`
    ///
    /// Image references must be lower case, so the project name is folded.
    pub fn local_image(&self) -> String {
        format!("{}:{}", self.repository_name(), self.tag)
    }

    /// Registry repository name derived from the project name
    pub fn repository_name(&self) -> String {
        self.project_name.to_lowercase()
    }
}
