//! Data Transfer Objects for the container control plane
//!
//! This module contains the request and response bodies exchanged with the
//! control plane and image registry APIs. Request bodies are derived from
//! the domain [`DeploymentSpec`](crate::domain::deployment::DeploymentSpec)
//! so that every create/update carries the complete desired state.

pub mod cluster;
pub mod registry;
pub mod service;
pub mod workload;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key/value resource tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Converts a tag map into the wire list, sorted by key
pub fn tags_from_map(tags: &BTreeMap<String, String>) -> Vec<Tag> {
    tags.iter().map(|(k, v)| Tag::new(k, v)).collect()
}
