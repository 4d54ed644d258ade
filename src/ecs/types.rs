//! Request and response bodies of the ECS JSON 1.1 API. Only the fields the
//! graph needs are modelled; everything else is ignored on decode.

use serde::{Deserialize, Serialize};

use crate::port::{ResourceAmount, Template};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListContainerInstancesRequest<'a> {
    pub cluster: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<&'a str>,
    pub max_results: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListContainerInstancesResponse {
    #[serde(default)]
    pub container_instance_arns: Vec<String>,
    pub next_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeContainerInstancesRequest<'a> {
    pub cluster: &'a str,
    pub container_instances: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeContainerInstancesResponse {
    #[serde(default)]
    pub container_instances: Vec<ContainerInstance>,
    #[serde(default)]
    pub failures: Vec<Failure>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInstance {
    pub container_instance_arn: String,
    pub ec2_instance_id: Option<String>,
    #[serde(default)]
    pub registered_resources: Vec<Resource>,
    #[serde(default)]
    pub remaining_resources: Vec<Resource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub name: String,
    pub integer_value: Option<i64>,
    pub long_value: Option<i64>,
    pub double_value: Option<f64>,
}

impl From<&Resource> for ResourceAmount {
    fn from(resource: &Resource) -> Self {
        // ECS fills exactly one of the value fields depending on `type`
        let value = resource
            .integer_value
            .or(resource.long_value)
            .map(|v| v as f64)
            .or(resource.double_value)
            .unwrap_or(0.0);
        ResourceAmount::new(&resource.name, value)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksRequest<'a> {
    pub cluster: &'a str,
    pub container_instance: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<&'a str>,
    pub max_results: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksResponse {
    #[serde(default)]
    pub task_arns: Vec<String>,
    pub next_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeTasksRequest<'a> {
    pub cluster: &'a str,
    pub tasks: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeTasksResponse {
    #[serde(default)]
    pub tasks: Vec<EcsTask>,
    #[serde(default)]
    pub failures: Vec<Failure>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcsTask {
    pub task_arn: String,
    pub task_definition_arn: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeTaskDefinitionRequest<'a> {
    pub task_definition: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeTaskDefinitionResponse {
    pub task_definition: TaskDefinition,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    pub task_definition_arn: Option<String>,
    pub family: Option<String>,
    #[serde(default)]
    pub container_definitions: Vec<ContainerDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDefinition {
    pub name: Option<String>,
    pub cpu: Option<f64>,
    /// Hard limit in MiB.
    pub memory: Option<f64>,
    /// Soft limit in MiB.
    pub memory_reservation: Option<f64>,
}

impl From<&TaskDefinition> for Template {
    fn from(td: &TaskDefinition) -> Self {
        let name = td
            .container_definitions
            .first()
            .and_then(|cd| cd.name.clone())
            .or_else(|| td.family.clone())
            .or_else(|| td.task_definition_arn.clone())
            .unwrap_or_default();

        let mut template = Template {
            name,
            ..Default::default()
        };
        for cd in &td.container_definitions {
            template.cpu += cd.cpu.unwrap_or(0.0);
            template.soft_memory += cd.memory_reservation.or(cd.memory).unwrap_or(0.0);
            template.hard_memory += cd.memory.or(cd.memory_reservation).unwrap_or(0.0);
        }
        template
    }
}

#[derive(Debug, Deserialize)]
pub struct Failure {
    pub arn: Option<String>,
    pub reason: Option<String>,
}

/// Error body returned with non-2xx answers.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "__type")]
    pub kind: Option<String>,
    #[serde(alias = "Message")]
    pub message: Option<String>,
}

/// Error types AWS answers with when a caller exceeds its request rate.
const THROTTLING_ERRORS: &[&str] = &[
    "ThrottlingException",
    "Throttling",
    "RequestLimitExceeded",
    "TooManyRequestsException",
];

impl ErrorResponse {
    fn short_kind(&self) -> Option<&str> {
        self.kind.as_deref().map(|k| k.rsplit('#').next().unwrap_or(k))
    }

    pub fn is_throttling(&self) -> bool {
        self.short_kind()
            .map(|kind| THROTTLING_ERRORS.contains(&kind))
            .unwrap_or(false)
    }

    /// `com.amazonaws.ecs#ClusterNotFoundException: Cluster not found.`
    /// becomes `ClusterNotFoundException: Cluster not found.`
    pub fn describe(&self) -> String {
        let kind = self.short_kind().unwrap_or("UnknownError");
        match &self.message {
            Some(message) => format!("{}: {}", kind, message),
            None => kind.to_string(),
        }
    }
}
