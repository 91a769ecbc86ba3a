//! Workload definition API endpoints

use crate::ControlPlaneClient;
use crate::error::Result;
use shipyard_core::dto::workload::{RegisterWorkload, WorkloadDefinition};

impl ControlPlaneClient {
    /// Describe the latest revision of a workload definition family
    ///
    /// # Returns
    /// `None` if the family has never been registered
    pub async fn describe_workload(&self, family: &str) -> Result<Option<WorkloadDefinition>> {
        let url = format!("{}/api/workloads/{}", self.base_url, family);
        let response = self.client.get(&url).send().await?;

        self.handle_optional_response(response).await
    }

    /// Register a new revision of a workload definition
    pub async fn register_workload(&self, req: &RegisterWorkload) -> Result<WorkloadDefinition> {
        let url = format!("{}/api/workloads", self.base_url);
        let response = self.client.post(&url).json(req).send().await?;

        self.handle_response(response).await
    }
}
