//! Image registry DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Tag;

/// An image repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub repository_name: String,
    pub repository_arn: String,
    /// Pushable URI without tag, e.g. `123.dkr.example.com/my-app`
    pub repository_uri: String,
}

/// Request to create an image repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRepository {
    pub repository_name: String,
    pub image_tag_mutability: String,
    pub scan_on_push: bool,
    pub tags: Vec<Tag>,
}

impl CreateRepository {
    /// Mutable tags, scan on push, tagged as created by this tool
    pub fn new(repository_name: impl Into<String>) -> Self {
        Self {
            repository_name: repository_name.into(),
            image_tag_mutability: "MUTABLE".to_string(),
            scan_on_push: true,
            tags: vec![Tag::new("CreatedBy", "shipyard")],
        }
    }
}

/// Registry login token
///
/// `authorization_token` is base64 of `user:password`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationData {
    pub authorization_token: String,
    pub proxy_endpoint: String,
    pub expires_at: Option<DateTime<Utc>>,
}
