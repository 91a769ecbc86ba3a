//! Pipeline stages
//!
//! A stage calls one set of collaborator operations and reports what it
//! produced. [`StageRunner`] turns the stage's `Result` into a classified
//! [`StageOutcome`]:
//! - mandatory stage failing → HardFail
//! - optional stage failing → SoftFail
//! - cancellation → HardFail, whatever the stage

mod build;
mod deploy;
mod package;
mod publish;

pub use build::BuildStage;
pub use deploy::DeployStage;
pub use package::PackageStage;
pub use publish::PublishStage;

use async_trait::async_trait;
use chrono::Utc;
use shipyard_core::domain::stage::{StageName, StageOutcome, StageResult};
use tracing::{error, info, warn};

use crate::context::{Artifact, PipelineContext, RunArtifacts};
use crate::error::{PipelineError, Result};

/// What a successful stage reports back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub message: String,
    pub artifact: Option<Artifact>,
}

impl StageReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            artifact: None,
        }
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifact = Some(artifact);
        self
    }
}

/// One step of the pipeline
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> StageName;

    /// Runs the stage against the read-only context
    async fn execute(&self, ctx: &PipelineContext, artifacts: &RunArtifacts) -> Result<StageReport>;
}

/// Maps a stage failure onto a stage result
pub fn classify(stage: StageName, error: &PipelineError) -> StageResult {
    if error.is_cancelled() || stage.is_mandatory() {
        StageResult::HardFail
    } else {
        StageResult::SoftFail
    }
}

/// Runs stages and classifies their outcomes
pub struct StageRunner;

impl StageRunner {
    /// Runs one stage, returning its outcome and any artifact it produced
    pub async fn run(
        stage: &dyn Stage,
        ctx: &PipelineContext,
        artifacts: &RunArtifacts,
    ) -> (StageOutcome, Option<Artifact>) {
        let name = stage.name();
        let started_at = Utc::now();

        let (result, message, artifact) = if ctx.cancel.is_cancelled() {
            (StageResult::HardFail, PipelineError::Cancelled.to_string(), None)
        } else {
            match stage.execute(ctx, artifacts).await {
                Ok(report) => (StageResult::Success, report.message, report.artifact),
                Err(e) => (classify(name, &e), e.to_string(), None),
            }
        };

        let outcome = StageOutcome {
            stage: name,
            result,
            message,
            started_at,
            finished_at: Utc::now(),
        };

        match outcome.result {
            StageResult::Success => info!(
                stage = %outcome.stage,
                result = %outcome.result,
                duration_secs = outcome.duration_secs(),
                message = %outcome.message,
                "stage finished"
            ),
            StageResult::SoftFail => warn!(
                stage = %outcome.stage,
                result = %outcome.result,
                duration_secs = outcome.duration_secs(),
                message = %outcome.message,
                "stage finished"
            ),
            StageResult::HardFail => error!(
                stage = %outcome.stage,
                result = %outcome.result,
                duration_secs = outcome.duration_secs(),
                message = %outcome.message,
                "stage finished"
            ),
        }

        (outcome, artifact)
    }
}
