//! Stage and pipeline outcome types

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageName {
    BuildAndTest,
    PublishToRegistry,
    DeployToService,
    PackageInstaller,
}

impl StageName {
    /// Fixed execution order
    pub const ORDER: [StageName; 4] = [
        StageName::BuildAndTest,
        StageName::PublishToRegistry,
        StageName::DeployToService,
        StageName::PackageInstaller,
    ];

    /// Mandatory stages abort the pipeline when they fail
    pub fn is_mandatory(&self) -> bool {
        !matches!(self, StageName::PackageInstaller)
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageName::BuildAndTest => write!(f, "build-and-test"),
            StageName::PublishToRegistry => write!(f, "publish-to-registry"),
            StageName::DeployToService => write!(f, "deploy-to-service"),
            StageName::PackageInstaller => write!(f, "package-installer"),
        }
    }
}

/// Classified result of one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageResult {
    Success,
    /// Recorded with a warning; the pipeline continues
    SoftFail,
    /// Stops the pipeline
    HardFail,
}

impl std::fmt::Display for StageResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageResult::Success => write!(f, "Success"),
            StageResult::SoftFail => write!(f, "SoftFail"),
            StageResult::HardFail => write!(f, "HardFail"),
        }
    }
}

/// Outcome of one stage run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: StageName,
    pub result: StageResult,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl StageOutcome {
    pub fn is_success(&self) -> bool {
        self.result == StageResult::Success
    }

    /// Wall-clock duration of the stage in seconds
    pub fn duration_secs(&self) -> i64 {
        self.finished_at
            .signed_duration_since(self.started_at)
            .num_seconds()
    }
}

/// Result of a full pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    /// Outcomes of the stages that ran, in execution order
    pub outcomes: Vec<StageOutcome>,
    pub success: bool,
    /// Registry reference of the image the run published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_image: Option<String>,
    /// Installer the run packaged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer: Option<PathBuf>,
}

impl PipelineResult {
    /// Builds the result, deriving overall success
    ///
    /// Success requires every mandatory stage to have run and succeeded.
    /// Optional stages never affect it.
    pub fn from_outcomes(run_id: Uuid, outcomes: Vec<StageOutcome>) -> Self {
        let success = StageName::ORDER
            .iter()
            .filter(|stage| stage.is_mandatory())
            .all(|stage| {
                outcomes
                    .iter()
                    .any(|outcome| outcome.stage == *stage && outcome.is_success())
            });

        Self {
            run_id,
            outcomes,
            success,
            published_image: None,
            installer: None,
        }
    }

    /// The stage that aborted the run, if any
    pub fn aborted_by(&self) -> Option<&StageOutcome> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.result == StageResult::HardFail)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &StageOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result == StageResult::SoftFail)
    }

    pub fn outcome(&self, stage: StageName) -> Option<&StageOutcome> {
        self.outcomes.iter().find(|outcome| outcome.stage == stage)
    }

    /// Process exit code: 0 on overall success, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.success { 0 } else { 1 }
    }
}
