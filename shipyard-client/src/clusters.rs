//! Cluster API endpoints

use crate::ControlPlaneClient;
use crate::error::Result;
use shipyard_core::dto::cluster::{ClusterRequest, ClusterSummary};

impl ControlPlaneClient {
    /// List all clusters visible to the caller
    pub async fn list_clusters(&self) -> Result<Vec<ClusterSummary>> {
        let url = format!("{}/api/clusters", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Find a cluster by name among the listed clusters
    ///
    /// Clusters in a terminal `INACTIVE` state are treated as absent.
    pub async fn find_cluster(&self, name: &str) -> Result<Option<ClusterSummary>> {
        let clusters = self.list_clusters().await?;

        Ok(clusters
            .into_iter()
            .find(|c| c.name == name && c.status != "INACTIVE"))
    }

    /// Create a cluster
    pub async fn create_cluster(&self, req: &ClusterRequest) -> Result<ClusterSummary> {
        let url = format!("{}/api/clusters", self.base_url);
        let response = self.client.post(&url).json(req).send().await?;

        self.handle_response(response).await
    }

    /// Replace the settings of an existing cluster
    pub async fn update_cluster(&self, req: &ClusterRequest) -> Result<ClusterSummary> {
        let url = format!("{}/api/clusters/{}", self.base_url, req.cluster_name);
        let response = self.client.put(&url).json(req).send().await?;

        self.handle_response(response).await
    }
}
