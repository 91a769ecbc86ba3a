//! Deployment target types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable description of one rollout
///
/// Built once per pipeline run from configuration and shared read-only
/// between stages. A rollout against a different image is a different spec:
/// use [`DeploymentSpec::with_image`] to derive it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    pub region: String,
    pub cluster_name: String,
    pub service_name: String,
    /// Workload definition family; revisions are registered under this name
    pub task_family: String,
    pub container_name: String,
    pub image_uri: String,
    pub desired_count: u32,
    /// CPU units (1024 = 1 vCPU)
    pub cpu: u32,
    /// Memory in MiB
    pub memory: u32,
    pub container_ports: Vec<u16>,
    pub environment: Vec<EnvVar>,
    pub network: NetworkPlacement,
    pub load_balancer: Option<LoadBalancerBinding>,
    pub tags: BTreeMap<String, String>,
    pub execution_role_arn: Option<String>,
    pub task_role_arn: Option<String>,
    pub rollout: RolloutPolicy,
    pub autoscaling: Option<AutoScaling>,
}

impl DeploymentSpec {
    /// Returns a copy of this spec targeting another image
    pub fn with_image(&self, image_uri: impl Into<String>) -> Self {
        Self {
            image_uri: image_uri.into(),
            ..self.clone()
        }
    }

    /// First exposed container port, used for load balancer bindings
    pub fn primary_port(&self) -> Option<u16> {
        self.container_ports.first().copied()
    }
}

/// A single container environment variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    /// Parses a `KEY=VALUE` string, splitting on the first `=`
    ///
    /// A string without `=` yields an empty value.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('=') {
            Some((name, value)) => Self {
                name: name.to_string(),
                value: value.to_string(),
            },
            None => Self {
                name: raw.to_string(),
                value: String::new(),
            },
        }
    }
}

/// Where service tasks are placed on the network
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPlacement {
    pub subnets: Vec<String>,
    pub security_group: Option<String>,
    pub assign_public_ip: bool,
}

/// Optional load balancer attachment for the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerBinding {
    pub load_balancer_arn: String,
    pub target_group_arn: String,
}

/// Rolling update parameters carried with every service create/update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutPolicy {
    /// Upper bound of running tasks during a rollout, as percent of desired
    pub maximum_percent: u32,
    /// Lower bound of healthy tasks during a rollout, as percent of desired
    pub minimum_healthy_percent: u32,
    /// Let the control plane detect a broken rollout
    pub circuit_breaker: bool,
    /// Roll back automatically when the circuit breaker trips
    pub rollback: bool,
}

impl Default for RolloutPolicy {
    fn default() -> Self {
        Self {
            maximum_percent: 200,
            minimum_healthy_percent: 100,
            circuit_breaker: true,
            rollback: true,
        }
    }
}

/// Autoscaling bounds for the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoScaling {
    pub min_capacity: u32,
    pub max_capacity: u32,
}
