//! Service API endpoints

use crate::ControlPlaneClient;
use crate::error::Result;
use shipyard_core::domain::service::ServiceStatus;
use shipyard_core::dto::service::{CreateService, ServiceDescription, UpdateService};

impl ControlPlaneClient {
    /// Describe a service
    ///
    /// # Returns
    /// `None` if no such service exists in the cluster
    pub async fn describe_service(
        &self,
        cluster: &str,
        service: &str,
    ) -> Result<Option<ServiceDescription>> {
        let url = format!(
            "{}/api/clusters/{}/services/{}",
            self.base_url, cluster, service
        );
        let response = self.client.get(&url).send().await?;

        self.handle_optional_response(response).await
    }

    /// Create a service
    pub async fn create_service(&self, req: &CreateService) -> Result<ServiceDescription> {
        let url = format!("{}/api/clusters/{}/services", self.base_url, req.cluster);
        let response = self.client.post(&url).json(req).send().await?;

        self.handle_response(response).await
    }

    /// Update a service with its full desired state
    pub async fn update_service(&self, req: &UpdateService) -> Result<ServiceDescription> {
        let url = format!(
            "{}/api/clusters/{}/services/{}",
            self.base_url, req.cluster, req.service
        );
        let response = self.client.put(&url).json(req).send().await?;

        self.handle_response(response).await
    }

    /// Fetch a fresh status snapshot of a service
    ///
    /// # Returns
    /// `None` if the service does not (yet) exist
    pub async fn service_status(
        &self,
        cluster: &str,
        service: &str,
    ) -> Result<Option<ServiceStatus>> {
        let url = format!(
            "{}/api/clusters/{}/services/{}/status",
            self.base_url, cluster, service
        );
        let response = self.client.get(&url).send().await?;

        self.handle_optional_response(response).await
    }
}
