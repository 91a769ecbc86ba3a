//! deploy-to-service stage
//!
//! Sequence: connectivity check, reconcile cluster, reconcile workload
//! definition, reconcile service, wait for stability, then fetch and report
//! the final status.
//! Any step failing fails the whole stage.

use async_trait::async_trait;
use shipyard_core::domain::deployment::DeploymentSpec;
use shipyard_core::domain::resource::ResourceKind;
use shipyard_core::domain::service::ServiceStatus;
use shipyard_core::domain::stage::StageName;
use tracing::info;

use super::{Stage, StageReport};
use crate::context::{PipelineContext, RunArtifacts};
use crate::error::{PipelineError, Result};
use crate::reconciler::ResourceReconciler;
use crate::watcher::{Stability, StabilityWatcher};

/// Converges the service onto the published image
pub struct DeployStage;

impl DeployStage {
    /// The deployment for this rollout: the configured one, retargeted at the
    /// image published earlier in the run if there is one
    fn rollout_spec(ctx: &PipelineContext, artifacts: &RunArtifacts) -> DeploymentSpec {
        match &artifacts.remote_image {
            Some(image) => ctx.deployment.with_image(image),
            None => ctx.deployment.as_ref().clone(),
        }
    }
}

fn report_status(status: &ServiceStatus) -> String {
    info!(
        service = %status.service_name,
        lifecycle = %status.lifecycle,
        running = status.running_count,
        desired = status.desired_count,
        "final service status"
    );

    let mut summary = format!(
        "{} {} ({}/{} running)",
        status.service_name, status.lifecycle, status.running_count, status.desired_count
    );
    if let Some(lb) = status.load_balancers.first() {
        let name = lb.load_balancer_name.as_deref().unwrap_or(&lb.target_group_arn);
        info!(load_balancer = name, port = lb.container_port, "load balancer endpoint");
        summary.push_str(&format!(", behind {}:{}", name, lb.container_port));
    }
    summary
}

#[async_trait]
impl Stage for DeployStage {
    fn name(&self) -> StageName {
        StageName::DeployToService
    }

    async fn execute(&self, ctx: &PipelineContext, artifacts: &RunArtifacts) -> Result<StageReport> {
        let spec = Self::rollout_spec(ctx, artifacts);
        let cluster = ctx.backends.cluster.clone();

        cluster.check_connectivity().await?;

        let reconciler = ResourceReconciler::new(cluster.clone());
        reconciler.reconcile(ResourceKind::Cluster, &spec).await?;
        reconciler
            .reconcile(ResourceKind::WorkloadDefinition, &spec)
            .await?;
        let service = reconciler.reconcile(ResourceKind::Service, &spec).await?;

        let watch = ctx.settings.watch;
        let watcher = StabilityWatcher::new(cluster, watch.poll_interval, watch.error_backoff);
        match watcher
            .watch(&spec.cluster_name, &spec.service_name, watch.timeout, &ctx.cancel)
            .await
        {
            Stability::Stable => {}
            Stability::TimedOut => {
                return Err(PipelineError::Timeout {
                    what: format!("service '{}' stabilization", spec.service_name),
                    limit: watch.timeout,
                });
            }
            Stability::Cancelled => return Err(PipelineError::Cancelled),
        }

        // The reported status is read after the wait, not reused from it
        let status = ctx
            .backends
            .cluster
            .service_status(&spec.cluster_name, &spec.service_name)
            .await?
            .ok_or_else(|| PipelineError::NotFound {
                kind: ResourceKind::Service,
                name: spec.service_name.clone(),
            })?;

        let verb = if service.was_created() { "created" } else { "updated" };
        Ok(StageReport::new(format!(
            "{verb} {} with {}; {}",
            service.handle(),
            spec.image_uri,
            report_status(&status)
        )))
    }
}
