//! Live service status

use serde::{Deserialize, Serialize};

/// Lifecycle state reported by the control plane for a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Provisioning,
    Active,
    Draining,
    Failed,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Provisioning => write!(f, "PROVISIONING"),
            LifecycleState::Active => write!(f, "ACTIVE"),
            LifecycleState::Draining => write!(f, "DRAINING"),
            LifecycleState::Failed => write!(f, "FAILED"),
        }
    }
}

/// Load balancer attachment as reported by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerEndpoint {
    pub target_group_arn: String,
    pub load_balancer_name: Option<String>,
    pub container_name: String,
    pub container_port: u16,
}

/// Point-in-time snapshot of a service
///
/// Always fetched fresh; never kept across stability polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub service_name: String,
    pub lifecycle: LifecycleState,
    pub desired_count: u32,
    pub running_count: u32,
    pub pending_count: u32,
    #[serde(default)]
    pub load_balancers: Vec<LoadBalancerEndpoint>,
}

impl ServiceStatus {
    /// Active, fully scaled, nothing pending
    pub fn is_stable(&self) -> bool {
        self.lifecycle == LifecycleState::Active
            && self.running_count == self.desired_count
            && self.pending_count == 0
    }
}
