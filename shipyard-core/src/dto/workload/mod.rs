//! Workload (task) definition DTOs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Tag, tags_from_map};
use crate::domain::deployment::{DeploymentSpec, EnvVar};

/// A registered workload definition
///
/// `family_arn` identifies the family across revisions and is what the
/// service references; `revision_arn` pins one revision. The registered
/// content is optional in responses; when it is missing the definition
/// never [`matches`](Self::matches) a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadDefinition {
    pub family: String,
    pub family_arn: String,
    pub revision: u32,
    pub revision_arn: String,
    #[serde(default)]
    pub network_mode: String,
    #[serde(default)]
    pub cpu: String,
    #[serde(default)]
    pub memory: String,
    #[serde(default)]
    pub container_definitions: Vec<ContainerDefinition>,
    #[serde(default)]
    pub execution_role_arn: Option<String>,
    #[serde(default)]
    pub task_role_arn: Option<String>,
}

impl WorkloadDefinition {
    /// Whether registering `req` would only repeat this revision
    ///
    /// Tags are not part of a revision and are ignored.
    pub fn matches(&self, req: &RegisterWorkload) -> bool {
        !self.container_definitions.is_empty()
            && self.family == req.family
            && self.network_mode == req.network_mode
            && self.cpu == req.cpu
            && self.memory == req.memory
            && self.container_definitions == req.container_definitions
            && self.execution_role_arn == req.execution_role_arn
            && self.task_role_arn == req.task_role_arn
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub container_port: u16,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfiguration {
    pub log_driver: String,
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDefinition {
    pub name: String,
    pub image: String,
    pub cpu: u32,
    pub memory: u32,
    pub essential: bool,
    pub environment: Vec<EnvVar>,
    pub port_mappings: Vec<PortMapping>,
    pub log_configuration: LogConfiguration,
}

/// Request to register a new revision of a workload definition family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterWorkload {
    pub family: String,
    pub network_mode: String,
    pub requires_compatibilities: Vec<String>,
    pub cpu: String,
    pub memory: String,
    pub container_definitions: Vec<ContainerDefinition>,
    pub execution_role_arn: Option<String>,
    pub task_role_arn: Option<String>,
    pub tags: Vec<Tag>,
}

impl From<&DeploymentSpec> for RegisterWorkload {
    fn from(spec: &DeploymentSpec) -> Self {
        let mut log_options = BTreeMap::new();
        log_options.insert(
            "awslogs-group".to_string(),
            format!("/ecs/{}", spec.task_family),
        );
        log_options.insert("awslogs-region".to_string(), spec.region.clone());
        log_options.insert("awslogs-stream-prefix".to_string(), "ecs".to_string());

        let container = ContainerDefinition {
            name: spec.container_name.clone(),
            image: spec.image_uri.clone(),
            cpu: spec.cpu,
            memory: spec.memory,
            essential: true,
            environment: spec.environment.clone(),
            port_mappings: spec
                .container_ports
                .iter()
                .map(|port| PortMapping {
                    container_port: *port,
                    protocol: "tcp".to_string(),
                })
                .collect(),
            log_configuration: LogConfiguration {
                log_driver: "awslogs".to_string(),
                options: log_options,
            },
        };

        Self {
            family: spec.task_family.clone(),
            network_mode: "awsvpc".to_string(),
            requires_compatibilities: vec!["FARGATE".to_string()],
            cpu: spec.cpu.to_string(),
            memory: spec.memory.to_string(),
            container_definitions: vec![container],
            execution_role_arn: spec.execution_role_arn.clone(),
            task_role_arn: spec.task_role_arn.clone(),
            tags: tags_from_map(&spec.tags),
        }
    }
}
