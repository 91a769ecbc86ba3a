//! Image registry backend
//!
//! Repositories are managed through the control plane API; image transfer
//! goes through the docker CLI after a token based login.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use shipyard_client::{ClientError, ControlPlaneClient};
use shipyard_core::dto::registry::CreateRepository;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::RegistryBackend;
use crate::error::{PipelineError, Result};
use crate::process::ProcessCommand;

const PUSH_TIMEOUT: Duration = Duration::from_secs(600);
const DOCKER_TIMEOUT: Duration = Duration::from_secs(60);

/// [`RegistryBackend`] over the control plane API and docker CLI
pub struct ImageRegistry {
    client: ControlPlaneClient,
}

impl ImageRegistry {
    pub fn new(client: ControlPlaneClient) -> Self {
        Self { client }
    }
}

/// Decodes a base64 `user:password` registry token
pub fn decode_credentials(token: &str) -> Result<(String, String)> {
    let bytes = STANDARD
        .decode(token.trim())
        .map_err(|e| malformed(format!("not base64: {e}")))?;
    let text = String::from_utf8(bytes).map_err(|_| malformed("not UTF-8".to_string()))?;

    match text.split_once(':') {
        Some((user, password)) => Ok((user.to_string(), password.to_string())),
        None => Err(malformed("no user:password pair".to_string())),
    }
}

fn malformed(reason: String) -> PipelineError {
    PipelineError::Client(ClientError::ParseError(format!(
        "malformed registry token: {reason}"
    )))
}

#[async_trait]
impl RegistryBackend for ImageRegistry {
    async fn ensure_repository(&self, name: &str) -> Result<String> {
        if let Some(repo) = self.client.describe_repository(name).await? {
            info!(repository = name, uri = %repo.repository_uri, "repository exists");
            return Ok(repo.repository_uri);
        }

        let repo = self
            .client
            .create_repository(&CreateRepository::new(name))
            .await?;
        info!(repository = name, uri = %repo.repository_uri, "repository created");
        Ok(repo.repository_uri)
    }

    async fn push(
        &self,
        local_image: &str,
        repository_uri: &str,
        tag: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let auth = self.client.authorization_token().await?;
        let (user, password) = decode_credentials(&auth.authorization_token)?;
        let remote = format!("{repository_uri}:{tag}");

        ProcessCommand::new("docker")
            .args(["tag", local_image, remote.as_str()])
            .timeout(DOCKER_TIMEOUT)
            .run_checked(cancel)
            .await?;

        ProcessCommand::new("docker")
            .args(["login", "--username", user.as_str(), "--password-stdin"])
            .arg(auth.proxy_endpoint.as_str())
            .stdin(password)
            .timeout(DOCKER_TIMEOUT)
            .run_checked(cancel)
            .await?;

        info!(image = %remote, "pushing image");
        ProcessCommand::new("docker")
            .args(["push", remote.as_str()])
            .timeout(PUSH_TIMEOUT)
            .echo_output()
            .run_checked(cancel)
            .await?;

        Ok(remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_credentials() {
        let token = STANDARD.encode("AWS:s3cr3t:with:colons");
        let (user, password) = decode_credentials(&token).unwrap();
        assert_eq!(user, "AWS");
        assert_eq!(password, "s3cr3t:with:colons");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_credentials("not base64 !!").is_err());
        assert!(decode_credentials(&STANDARD.encode("no-separator")).is_err());
    }
}
