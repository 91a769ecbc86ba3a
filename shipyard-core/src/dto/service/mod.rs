//! Service DTOs

use serde::{Deserialize, Serialize};

use super::{Tag, tags_from_map};
use crate::domain::deployment::{DeploymentSpec, RolloutPolicy};

/// Service as described by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescription {
    pub service_name: String,
    pub service_arn: String,
    pub cluster_arn: String,
    pub task_definition: String,
    pub desired_count: u32,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreaker {
    pub enable: bool,
    pub rollback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfiguration {
    pub maximum_percent: u32,
    pub minimum_healthy_percent: u32,
    pub deployment_circuit_breaker: CircuitBreaker,
}

impl From<&RolloutPolicy> for DeploymentConfiguration {
    fn from(policy: &RolloutPolicy) -> Self {
        Self {
            maximum_percent: policy.maximum_percent,
            minimum_healthy_percent: policy.minimum_healthy_percent,
            deployment_circuit_breaker: CircuitBreaker {
                enable: policy.circuit_breaker,
                rollback: policy.rollback,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfiguration {
    pub subnets: Vec<String>,
    /// Omitted entirely when no security group is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_groups: Option<Vec<String>>,
    pub assign_public_ip: bool,
}

impl From<&DeploymentSpec> for NetworkConfiguration {
    fn from(spec: &DeploymentSpec) -> Self {
        Self {
            subnets: spec.network.subnets.clone(),
            security_groups: spec
                .network
                .security_group
                .as_ref()
                .filter(|sg| !sg.is_empty())
                .map(|sg| vec![sg.clone()]),
            assign_public_ip: spec.network.assign_public_ip,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerAttachment {
    pub target_group_arn: String,
    pub container_name: String,
    pub container_port: u16,
}

/// Builds the load balancer attachment when the deployment binds one
fn load_balancers(spec: &DeploymentSpec) -> Vec<LoadBalancerAttachment> {
    match (&spec.load_balancer, spec.primary_port()) {
        (Some(binding), Some(port))
            if !binding.load_balancer_arn.is_empty() && !binding.target_group_arn.is_empty() =>
        {
            vec![LoadBalancerAttachment {
                target_group_arn: binding.target_group_arn.clone(),
                container_name: spec.container_name.clone(),
                container_port: port,
            }]
        }
        _ => Vec::new(),
    }
}

/// Request to create a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateService {
    pub cluster: String,
    pub service_name: String,
    pub task_definition: String,
    pub desired_count: u32,
    pub launch_type: String,
    pub deployment_configuration: DeploymentConfiguration,
    pub network_configuration: NetworkConfiguration,
    pub load_balancers: Vec<LoadBalancerAttachment>,
    pub tags: Vec<Tag>,
}

impl From<&DeploymentSpec> for CreateService {
    fn from(spec: &DeploymentSpec) -> Self {
        Self {
            cluster: spec.cluster_name.clone(),
            service_name: spec.service_name.clone(),
            task_definition: spec.task_family.clone(),
            desired_count: spec.desired_count,
            launch_type: "FARGATE".to_string(),
            deployment_configuration: (&spec.rollout).into(),
            network_configuration: spec.into(),
            load_balancers: load_balancers(spec),
            tags: tags_from_map(&spec.tags),
        }
    }
}

/// Request to replace the desired state of an existing service
///
/// Carries the full spec rather than a patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateService {
    pub cluster: String,
    pub service: String,
    pub task_definition: String,
    pub desired_count: u32,
    pub deployment_configuration: DeploymentConfiguration,
    pub network_configuration: NetworkConfiguration,
    pub load_balancers: Vec<LoadBalancerAttachment>,
    pub force_new_deployment: bool,
}

impl From<&DeploymentSpec> for UpdateService {
    fn from(spec: &DeploymentSpec) -> Self {
        Self {
            cluster: spec.cluster_name.clone(),
            service: spec.service_name.clone(),
            task_definition: spec.task_family.clone(),
            desired_count: spec.desired_count,
            deployment_configuration: (&spec.rollout).into(),
            network_configuration: spec.into(),
            load_balancers: load_balancers(spec),
            force_new_deployment: false,
        }
    }
}
