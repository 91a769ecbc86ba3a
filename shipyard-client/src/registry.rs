//! Image registry API endpoints

use crate::ControlPlaneClient;
use crate::error::Result;
use shipyard_core::dto::registry::{AuthorizationData, CreateRepository, Repository};

impl ControlPlaneClient {
    /// Describe an image repository
    ///
    /// # Returns
    /// `None` if the repository does not exist
    pub async fn describe_repository(&self, name: &str) -> Result<Option<Repository>> {
        let url = format!("{}/api/repositories/{}", self.base_url, name);
        let response = self.client.get(&url).send().await?;

        self.handle_optional_response(response).await
    }

    /// Create an image repository
    pub async fn create_repository(&self, req: &CreateRepository) -> Result<Repository> {
        let url = format!("{}/api/repositories", self.base_url);
        let response = self.client.post(&url).json(req).send().await?;

        self.handle_response(response).await
    }

    /// Fetch a short-lived registry login token
    pub async fn authorization_token(&self) -> Result<AuthorizationData> {
        let url = format!("{}/api/registry/token", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }
}
