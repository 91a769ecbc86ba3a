//! Infrastructure resource identity

use serde::{Deserialize, Serialize};

/// Kind of infrastructure resource converged by the deploy stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Cluster,
    WorkloadDefinition,
    Service,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Cluster => write!(f, "cluster"),
            ResourceKind::WorkloadDefinition => write!(f, "workload definition"),
            ResourceKind::Service => write!(f, "service"),
        }
    }
}

/// Opaque identifier (ARN-like) of a created or updated resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceHandle(String);

impl ResourceHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which branch a reconcile took
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reconciled {
    /// The resource did not exist and was created
    Created(ResourceHandle),
    /// The resource existed and received the full desired spec
    Updated(ResourceHandle),
}

impl Reconciled {
    pub fn handle(&self) -> &ResourceHandle {
        match self {
            Reconciled::Created(handle) | Reconciled::Updated(handle) => handle,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Reconciled::Created(_))
    }
}
