//! Pipeline orchestration
//!
//! Runs the stages strictly in order. A HardFail stops the run at once and
//! later stages neither run nor appear in the result; a SoftFail is
//! recorded with a warning and the run continues.

use shipyard_core::domain::stage::{PipelineResult, StageResult};
use tracing::{error, info, warn};

use crate::context::{PipelineContext, RunArtifacts};
use crate::stage::{BuildStage, DeployStage, PackageStage, PublishStage, Stage, StageRunner};

/// Sequences the pipeline stages
pub struct PipelineOrchestrator {
    stages: Vec<Box<dyn Stage>>,
}

impl PipelineOrchestrator {
    /// build-and-test → publish-to-registry → deploy-to-service → package-installer
    pub fn new() -> Self {
        Self::with_stages(vec![
            Box::new(BuildStage),
            Box::new(PublishStage),
            Box::new(DeployStage),
            Box::new(PackageStage),
        ])
    }

    pub fn with_stages(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    pub async fn run(&self, ctx: &PipelineContext) -> PipelineResult {
        info!(run_id = %ctx.run_id, stages = self.stages.len(), "pipeline started");

        let mut artifacts = RunArtifacts::default();
        let mut outcomes = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let (outcome, artifact) = StageRunner::run(stage.as_ref(), ctx, &artifacts).await;
            if let Some(artifact) = artifact {
                artifacts.record(artifact);
            }

            let result = outcome.result;
            outcomes.push(outcome);

            match result {
                StageResult::Success => {}
                StageResult::SoftFail => warn!(stage = %stage.name(), "stage failed, continuing"),
                StageResult::HardFail => {
                    error!(stage = %stage.name(), "stage failed, aborting pipeline");
                    break;
                }
            }
        }

        let mut result = PipelineResult::from_outcomes(ctx.run_id, outcomes);
        result.published_image = artifacts.remote_image;
        result.installer = artifacts.installer;
        log_summary(&result);
        result
    }
}

impl Default for PipelineOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

fn log_summary(result: &PipelineResult) {
    let succeeded: Vec<String> = result
        .outcomes
        .iter()
        .filter(|o| o.is_success())
        .map(|o| o.stage.to_string())
        .collect();
    let warned: Vec<String> = result.warnings().map(|o| o.stage.to_string()).collect();
    let aborted = result.aborted_by().map(|o| o.stage.to_string());
    let image = result.published_image.as_deref().unwrap_or("-");
    let installer = result
        .installer
        .as_deref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "-".to_string());

    if result.success {
        info!(
            run_id = %result.run_id,
            succeeded = %succeeded.join(","),
            warned = %warned.join(","),
            image,
            installer = %installer,
            "pipeline succeeded"
        );
    } else {
        error!(
            run_id = %result.run_id,
            succeeded = %succeeded.join(","),
            warned = %warned.join(","),
            aborted = aborted.as_deref().unwrap_or("-"),
            "pipeline failed"
        );
    }
}
