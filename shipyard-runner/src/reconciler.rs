//! Create-or-update convergence of deployment resources
//!
//! Resource names are the idempotency key. Reconciling looks the resource
//! up by name; absent means create, present means push the complete
//! desired spec as an update. Running it twice with the same spec yields
//! the same handle and leaves the backend in the same state; for workload
//! definitions that includes not registering a redundant revision.

use std::sync::Arc;

use shipyard_core::domain::deployment::DeploymentSpec;
use shipyard_core::domain::resource::{Reconciled, ResourceHandle, ResourceKind};
use tracing::info;

use crate::backend::ClusterBackend;
use crate::error::Result;

/// Converges clusters, workload definitions and services
pub struct ResourceReconciler {
    backend: Arc<dyn ClusterBackend>,
}

impl ResourceReconciler {
    pub fn new(backend: Arc<dyn ClusterBackend>) -> Self {
        Self { backend }
    }

    /// Brings one resource kind in line with `desired`
    ///
    /// Lookup errors (transport, auth) propagate unchanged; only an
    /// explicit "not found" takes the create branch.
    pub async fn reconcile(&self, kind: ResourceKind, desired: &DeploymentSpec) -> Result<Reconciled> {
        let existing = self.lookup(kind, desired).await?;

        let reconciled = match existing {
            None => Reconciled::Created(self.create(kind, desired).await?),
            Some(current) => {
                let updated = self.update(kind, desired).await?;
                // Workload definitions return a family handle that is stable
                // across revisions; keep whatever the lookup reported.
                Reconciled::Updated(if kind == ResourceKind::WorkloadDefinition {
                    current
                } else {
                    updated
                })
            }
        };

        info!(
            kind = %kind,
            name = resource_name(kind, desired),
            created = reconciled.was_created(),
            handle = %reconciled.handle(),
            "reconciled resource"
        );
        Ok(reconciled)
    }

    async fn lookup(&self, kind: ResourceKind, spec: &DeploymentSpec) -> Result<Option<ResourceHandle>> {
        match kind {
            ResourceKind::Cluster => self.backend.find_cluster(&spec.cluster_name).await,
            ResourceKind::WorkloadDefinition => self.backend.find_workload(&spec.task_family).await,
            ResourceKind::Service => {
                self.backend
                    .find_service(&spec.cluster_name, &spec.service_name)
                    .await
            }
        }
    }

    async fn create(&self, kind: ResourceKind, spec: &DeploymentSpec) -> Result<ResourceHandle> {
        match kind {
            ResourceKind::Cluster => self.backend.create_cluster(spec).await,
            ResourceKind::WorkloadDefinition => self.backend.register_workload(spec).await,
            ResourceKind::Service => self.backend.create_service(spec).await,
        }
    }

    async fn update(&self, kind: ResourceKind, spec: &DeploymentSpec) -> Result<ResourceHandle> {
        match kind {
            ResourceKind::Cluster => self.backend.update_cluster(spec).await,
            ResourceKind::WorkloadDefinition => self.backend.update_workload(spec).await,
            ResourceKind::Service => self.backend.update_service(spec).await,
        }
    }
}

fn resource_name(kind: ResourceKind, spec: &DeploymentSpec) -> &str {
    match kind {
        ResourceKind::Cluster => &spec.cluster_name,
        ResourceKind::WorkloadDefinition => &spec.task_family,
        ResourceKind::Service => &spec.service_name,
    }
}
