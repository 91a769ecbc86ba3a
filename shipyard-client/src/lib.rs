//! Shipyard HTTP Client
//!
//! A type-safe HTTP client for the container control plane and image
//! registry APIs that the deployment engine converges against.
//!
//! Every create/update call carries the complete desired state derived from
//! a [`DeploymentSpec`](shipyard_core::domain::deployment::DeploymentSpec);
//! describe calls map a missing resource to `None` so callers can branch
//! between create and update.
//!
//! # Example
//!
//! ```no_run
//! use shipyard_client::ControlPlaneClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ControlPlaneClient::new("http://localhost:4566");
//!
//!     for cluster in client.list_clusters().await? {
//!         println!("{} ({})", cluster.name, cluster.status);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
mod clusters;
mod registry;
mod services;
mod workloads;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

/// HTTP client for the control plane and registry APIs
///
/// Endpoints are organized into logical groups:
/// - Clusters (list, create, update)
/// - Workload definitions (describe family, register revision)
/// - Services (describe, create, update, live status)
/// - Registry (repositories, authorization token)
#[derive(Debug, Clone)]
pub struct ControlPlaneClient {
    /// Base URL of the control plane (e.g., "http://localhost:4566")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl ControlPlaneClient {
    /// Create a new control plane client
    ///
    /// # Example
    /// ```
    /// use shipyard_client::ControlPlaneClient;
    ///
    /// let client = ControlPlaneClient::new("http://localhost:4566");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Get the base URL of the control plane
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            debug!(status = status.as_u16(), body = %error_text, "control plane request failed");
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle a describe-style response where 404 means "does not exist"
    async fn handle_optional_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<Option<T>> {
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        self.handle_response(response).await.map(Some)
    }
}
