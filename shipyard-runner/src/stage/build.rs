//! build-and-test stage

use async_trait::async_trait;
use shipyard_core::domain::stage::StageName;
use tracing::warn;

use super::{Stage, StageReport};
use crate::context::{Artifact, PipelineContext, RunArtifacts};
use crate::error::{PipelineError, Result};
use crate::local_env;

/// Builds the image and optionally verifies it with a local environment
pub struct BuildStage;

#[async_trait]
impl Stage for BuildStage {
    fn name(&self) -> StageName {
        StageName::BuildAndTest
    }

    async fn execute(&self, ctx: &PipelineContext, _artifacts: &RunArtifacts) -> Result<StageReport> {
        let backend = &ctx.backends.build;
        backend.check_environment(&ctx.cancel).await?;

        let image = backend.build(&ctx.build, &ctx.cancel).await?;
        let mut message = format!("built {image}");

        let verify = &ctx.settings.verify;
        if verify.enabled {
            let verified = local_env::verify(backend.clone(), &ctx.build, verify, &ctx.cancel).await;
            match verified {
                Ok(true) => message.push_str(", local verification passed"),
                Ok(false) if verify.required => {
                    return Err(PipelineError::Process {
                        program: "health check".to_string(),
                        exit_code: 1,
                        stderr: format!("{} did not report healthy", verify.health_url),
                    });
                }
                Err(e) if verify.required || e.is_cancelled() => return Err(e),
                Ok(false) => {
                    warn!("local verification failed, continuing");
                    message.push_str(", local verification failed (advisory)");
                }
                Err(e) => {
                    warn!("local verification errored, continuing: {}", e);
                    message.push_str(", local verification errored (advisory)");
                }
            }
        }

        Ok(StageReport::new(message).with_artifact(Artifact::LocalImage(image)))
    }
}
