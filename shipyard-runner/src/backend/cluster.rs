//! Control plane backed by the HTTP client

use async_trait::async_trait;
use shipyard_client::ControlPlaneClient;
use shipyard_core::domain::deployment::DeploymentSpec;
use shipyard_core::domain::resource::{ResourceHandle, ResourceKind};
use shipyard_core::domain::service::ServiceStatus;
use shipyard_core::dto::cluster::ClusterRequest;
use shipyard_core::dto::service::{CreateService, UpdateService};
use shipyard_core::dto::workload::RegisterWorkload;
use tracing::debug;

use super::ClusterBackend;
use crate::error::{PipelineError, Result};

/// [`ClusterBackend`] over [`ControlPlaneClient`]
pub struct ControlPlane {
    client: ControlPlaneClient,
}

impl ControlPlane {
    pub fn new(client: ControlPlaneClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterBackend for ControlPlane {
    async fn check_connectivity(&self) -> Result<()> {
        let clusters = self.client.list_clusters().await?;
        debug!(
            "control plane at {} reachable ({} clusters)",
            self.client.base_url(),
            clusters.len()
        );
        Ok(())
    }

    async fn find_cluster(&self, name: &str) -> Result<Option<ResourceHandle>> {
        let cluster = self.client.find_cluster(name).await?;
        Ok(cluster.map(|c| ResourceHandle::new(c.arn)))
    }

    async fn create_cluster(&self, spec: &DeploymentSpec) -> Result<ResourceHandle> {
        let req = ClusterRequest::from(spec);
        let cluster = self
            .client
            .create_cluster(&req)
            .await
            .map_err(|e| PipelineError::rejected(ResourceKind::Cluster, &spec.cluster_name, e))?;
        Ok(ResourceHandle::new(cluster.arn))
    }

    async fn update_cluster(&self, spec: &DeploymentSpec) -> Result<ResourceHandle> {
        let req = ClusterRequest::from(spec);
        let cluster = self
            .client
            .update_cluster(&req)
            .await
            .map_err(|e| PipelineError::rejected(ResourceKind::Cluster, &spec.cluster_name, e))?;
        Ok(ResourceHandle::new(cluster.arn))
    }

    async fn find_workload(&self, family: &str) -> Result<Option<ResourceHandle>> {
        let workload = self.client.describe_workload(family).await?;
        Ok(workload.map(|w| ResourceHandle::new(w.family_arn)))
    }

    async fn register_workload(&self, spec: &DeploymentSpec) -> Result<ResourceHandle> {
        let req = RegisterWorkload::from(spec);
        let workload = self.client.register_workload(&req).await.map_err(|e| {
            PipelineError::rejected(ResourceKind::WorkloadDefinition, &spec.task_family, e)
        })?;
        debug!(
            family = %workload.family,
            revision = workload.revision,
            "registered workload definition revision"
        );
        Ok(ResourceHandle::new(workload.family_arn))
    }

    async fn update_workload(&self, spec: &DeploymentSpec) -> Result<ResourceHandle> {
        let req = RegisterWorkload::from(spec);
        let current = self.client.describe_workload(&spec.task_family).await?;
        if let Some(current) = current.filter(|c| c.matches(&req)) {
            debug!(
                family = %current.family,
                revision = current.revision,
                "workload definition unchanged, keeping revision"
            );
            return Ok(ResourceHandle::new(current.family_arn));
        }
        self.register_workload(spec).await
    }

    async fn find_service(&self, cluster: &str, service: &str) -> Result<Option<ResourceHandle>> {
        let description = self.client.describe_service(cluster, service).await?;
        Ok(description
            .filter(|s| s.status != "INACTIVE")
            .map(|s| ResourceHandle::new(s.service_arn)))
    }

    async fn create_service(&self, spec: &DeploymentSpec) -> Result<ResourceHandle> {
        let req = CreateService::from(spec);
        let service = self
            .client
            .create_service(&req)
            .await
            .map_err(|e| PipelineError::rejected(ResourceKind::Service, &spec.service_name, e))?;
        Ok(ResourceHandle::new(service.service_arn))
    }

    async fn update_service(&self, spec: &DeploymentSpec) -> Result<ResourceHandle> {
        let req = UpdateService::from(spec);
        let service = self
            .client
            .update_service(&req)
            .await
            .map_err(|e| PipelineError::rejected(ResourceKind::Service, &spec.service_name, e))?;
        Ok(ResourceHandle::new(service.service_arn))
    }

    async fn service_status(&self, cluster: &str, service: &str) -> Result<Option<ServiceStatus>> {
        Ok(self.client.service_status(cluster, service).await?)
    }
}
