//! package-installer stage

use async_trait::async_trait;
use shipyard_core::domain::stage::StageName;
use tracing::{info, warn};

use super::{Stage, StageReport};
use crate::context::{Artifact, PipelineContext, RunArtifacts};
use crate::error::{PipelineError, Result};

/// Generates, compiles and optionally signs the desktop installer
pub struct PackageStage;

#[async_trait]
impl Stage for PackageStage {
    fn name(&self) -> StageName {
        StageName::PackageInstaller
    }

    async fn execute(&self, ctx: &PipelineContext, _artifacts: &RunArtifacts) -> Result<StageReport> {
        if ctx.settings.skip_installer {
            info!("installer packaging skipped");
            return Ok(StageReport::new("skipped"));
        }

        let installer = &ctx.backends.installer;
        if !installer.check_toolchain(&ctx.cancel).await {
            return Err(PipelineError::ToolchainMissing(
                "Inno Setup compiler".to_string(),
            ));
        }

        let script = installer.generate_script(&ctx.installer);
        let binary = installer.compile(&ctx.installer, &script, &ctx.cancel).await?;

        let Some(signing) = &ctx.settings.signing else {
            return Ok(StageReport::new(format!("packaged {}", binary.display()))
                .with_artifact(Artifact::Installer(binary)));
        };

        match installer
            .sign(&binary, &signing.certificate, &signing.password, &ctx.cancel)
            .await
        {
            Ok(signed) => Ok(StageReport::new(format!("packaged and signed {}", signed.display()))
                .with_artifact(Artifact::Installer(signed))),
            Err(PipelineError::Cancelled) => Err(PipelineError::Cancelled),
            Err(e) => {
                warn!("signing failed, keeping unsigned installer: {}", e);
                Ok(StageReport::new(format!("packaged {} (unsigned: {e})", binary.display()))
                    .with_artifact(Artifact::Installer(binary)))
            }
        }
    }
}
