//! Cluster DTOs

use serde::{Deserialize, Serialize};

use super::{Tag, tags_from_map};
use crate::domain::deployment::DeploymentSpec;

/// Tag stamped on every cluster this tool creates
pub const CREATED_BY_TAG: (&str, &str) = ("CreatedBy", "shipyard");

/// Summary of a cluster as listed by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub name: String,
    pub arn: String,
    pub status: String,
}

/// Capacity provider weighting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityProviderStrategy {
    pub capacity_provider: String,
    pub weight: u32,
    pub base: u32,
}

/// Cluster-level setting, e.g. container insights
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSetting {
    pub name: String,
    pub value: String,
}

/// Full desired state of a cluster
///
/// Used both to create a cluster and to replace the settings of an
/// existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRequest {
    pub cluster_name: String,
    pub capacity_providers: Vec<String>,
    pub default_capacity_provider_strategy: Vec<CapacityProviderStrategy>,
    pub settings: Vec<ClusterSetting>,
    pub tags: Vec<Tag>,
}

impl From<&DeploymentSpec> for ClusterRequest {
    fn from(spec: &DeploymentSpec) -> Self {
        let mut tags = tags_from_map(&spec.tags);
        if !tags.iter().any(|t| t.key == CREATED_BY_TAG.0) {
            tags.insert(0, Tag::new(CREATED_BY_TAG.0, CREATED_BY_TAG.1));
        }

        Self {
            cluster_name: spec.cluster_name.clone(),
            capacity_providers: vec!["FARGATE".to_string()],
            default_capacity_provider_strategy: vec![CapacityProviderStrategy {
                capacity_provider: "FARGATE".to_string(),
                weight: 1,
                base: 0,
            }],
            settings: vec![ClusterSetting {
                name: "containerInsights".to_string(),
                value: "enabled".to_string(),
            }],
            tags,
        }
    }
}
