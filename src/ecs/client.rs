use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::sigv4::{Credentials, Signer};
use super::types::*;
use crate::error::{Error, Result, UpstreamError};
use crate::port::{NodeDetail, NodeRef, QueryPort, ResourceAmount, TaskDetail, TaskRef, Template};

const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET_PREFIX: &str = "AmazonEC2ContainerServiceV20141113";
const PAGE_SIZE: u32 = 100;

/// Backoff for throttled, 5xx and unreachable calls. Delays double from
/// `base_delay` up to `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// One failed attempt, and whether sending it again may succeed.
struct Failed {
    error: Error,
    retryable: bool,
}

impl Failed {
    fn fatal(error: impl Into<Error>) -> Self {
        Failed {
            error: error.into(),
            retryable: false,
        }
    }
}

/// `QueryPort` over the ECS JSON API. Clusters are addressed by name or ARN.
pub struct Client {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    host: String,
    signer: Signer,
    retry: RetryPolicy,
}

impl Client {
    pub fn new(
        endpoint: &str,
        region: &str,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self> {
        let endpoint = reqwest::Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("invalid ECS endpoint {:?}: {}", endpoint, e)))?;
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(Error::Config(format!("ECS endpoint {} has no host", endpoint)));
            }
        };
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Client {
            client,
            endpoint,
            host,
            signer: Signer::new(credentials, region, "ecs"),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn regional_endpoint(region: &str) -> String {
        format!("https://ecs.{}.amazonaws.com/", region)
    }

    async fn call<Req, Resp>(&self, operation: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let endpoint = format!("ecs {}", operation);
        let body = serde_json::to_vec(request).map_err(|e| UpstreamError::ErrorDecodingResponse {
            endpoint: endpoint.clone(),
            reason: format!("cannot encode request: {}", e),
        })?;
        let target = format!("{}.{}", TARGET_PREFIX, operation);

        let mut retries = 0;
        let mut backoff = self.retry.base_delay;
        loop {
            match self.attempt(&endpoint, &target, &body).await {
                Ok(res) => return Ok(res),
                Err(failed) if failed.retryable && retries < self.retry.max_retries => {
                    retries += 1;
                    warn!(
                        "[ECS] {} failed: {}, retry {}/{} in {:?}",
                        operation, failed.error, retries, self.retry.max_retries, backoff
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = std::cmp::min(backoff * 2, self.retry.max_delay);
                }
                Err(failed) => return Err(failed.error),
            }
        }
    }

    async fn attempt<Resp>(
        &self,
        endpoint: &str,
        target: &str,
        body: &[u8],
    ) -> std::result::Result<Resp, Failed>
    where
        Resp: DeserializeOwned,
    {
        // re-signed on every attempt, the signature embeds the time
        let signed = self.signer.sign(
            &self.host,
            self.endpoint.path(),
            CONTENT_TYPE,
            target,
            body,
            Utc::now(),
        );

        debug!("[ECS] {} ({} bytes)", target, body.len());
        let mut req = self
            .client
            .post(self.endpoint.clone())
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Amz-Target", target)
            .body(body.to_vec());
        for (name, value) in signed {
            req = req.header(name, value);
        }

        let res = req.send().await.map_err(|source| Failed {
            error: UpstreamError::ErrorReachingUpstream {
                endpoint: endpoint.to_string(),
                source,
            }
            .into(),
            retryable: true,
        })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let (body, throttled) = match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(err) => (err.describe(), err.is_throttling()),
                Err(_) => (text, false),
            };
            let retryable =
                throttled || status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS;
            return Err(Failed {
                error: UpstreamError::StatusCodeError {
                    endpoint: endpoint.to_string(),
                    status,
                    body,
                }
                .into(),
                retryable,
            });
        }

        res.json::<Resp>().await.map_err(|e| {
            Failed::fatal(UpstreamError::ErrorDecodingResponse {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })
        })
    }
}

fn log_failures(operation: &str, failures: &[Failure]) {
    for failure in failures {
        warn!(
            "[ECS] {} failure for {}: {}",
            operation,
            failure.arn.as_deref().unwrap_or("?"),
            failure.reason.as_deref().unwrap_or("no reason given")
        );
    }
}

#[async_trait]
impl QueryPort for Client {
    async fn list_nodes(&self, cluster: &str) -> Result<Vec<NodeRef>> {
        let mut refs = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let request = ListContainerInstancesRequest {
                cluster,
                next_token: next_token.as_deref(),
                max_results: PAGE_SIZE,
            };
            let page: ListContainerInstancesResponse =
                self.call("ListContainerInstances", &request).await?;
            refs.extend(page.container_instance_arns.into_iter().map(NodeRef));
            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }
        Ok(refs)
    }

    async fn describe_nodes(&self, cluster: &str, refs: &[NodeRef]) -> Result<Vec<NodeDetail>> {
        let request = DescribeContainerInstancesRequest {
            cluster,
            container_instances: refs.iter().map(|r| r.0.as_str()).collect(),
        };
        let res: DescribeContainerInstancesResponse =
            self.call("DescribeContainerInstances", &request).await?;
        log_failures("DescribeContainerInstances", &res.failures);

        let details = res
            .container_instances
            .into_iter()
            .map(|ci| NodeDetail {
                name: ci
                    .ec2_instance_id
                    .clone()
                    .unwrap_or_else(|| ci.container_instance_arn.clone()),
                registered: ci.registered_resources.iter().map(ResourceAmount::from).collect(),
                remaining: ci.remaining_resources.iter().map(ResourceAmount::from).collect(),
                node_ref: NodeRef(ci.container_instance_arn),
            })
            .collect();
        Ok(details)
    }

    async fn list_tasks(&self, cluster: &str, node: &NodeRef) -> Result<Vec<TaskRef>> {
        let mut refs = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let request = ListTasksRequest {
                cluster,
                container_instance: &node.0,
                next_token: next_token.as_deref(),
                max_results: PAGE_SIZE,
            };
            let page: ListTasksResponse = self.call("ListTasks", &request).await?;
            refs.extend(page.task_arns.into_iter().map(TaskRef));
            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }
        Ok(refs)
    }

    async fn describe_tasks(&self, cluster: &str, refs: &[TaskRef]) -> Result<Vec<TaskDetail>> {
        let request = DescribeTasksRequest {
            cluster,
            tasks: refs.iter().map(|r| r.0.as_str()).collect(),
        };
        let res: DescribeTasksResponse = self.call("DescribeTasks", &request).await?;
        // tasks stopped between ListTasks and DescribeTasks come back as failures
        log_failures("DescribeTasks", &res.failures);

        let details = res
            .tasks
            .into_iter()
            .map(|t| TaskDetail {
                task_ref: TaskRef(t.task_arn),
                template_id: t.task_definition_arn,
            })
            .collect();
        Ok(details)
    }

    async fn describe_template(&self, template_id: &str) -> Result<Template> {
        let request = DescribeTaskDefinitionRequest {
            task_definition: template_id,
        };
        let res: DescribeTaskDefinitionResponse =
            self.call("DescribeTaskDefinition", &request).await?;
        Ok(Template::from(&res.task_definition))
    }
}
