//! publish-to-registry stage

use async_trait::async_trait;
use shipyard_core::domain::stage::StageName;

use super::{Stage, StageReport};
use crate::context::{Artifact, PipelineContext, RunArtifacts};
use crate::error::{PipelineError, Result};

/// Ensures the repository exists and pushes the built image
pub struct PublishStage;

#[async_trait]
impl Stage for PublishStage {
    fn name(&self) -> StageName {
        StageName::PublishToRegistry
    }

    async fn execute(&self, ctx: &PipelineContext, artifacts: &RunArtifacts) -> Result<StageReport> {
        let local_image = artifacts
            .local_image
            .as_deref()
            .ok_or_else(|| PipelineError::Config("no locally built image to publish".to_string()))?;

        let target = &ctx.settings.registry;
        let registry = &ctx.backends.registry;

        let repository_uri = registry.ensure_repository(&target.repository).await?;
        let remote = registry
            .push(local_image, &repository_uri, &target.tag, &ctx.cancel)
            .await?;

        Ok(StageReport::new(format!("pushed {remote}")).with_artifact(Artifact::RemoteImage(remote)))
    }
}
