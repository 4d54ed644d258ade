use async_trait::async_trait;

use super::types::{NodeDetail, NodeRef, TaskDetail, TaskRef, Template};
use crate::error::Result;

/// Largest number of references a single describe call may carry. This is
/// an upstream limit; callers are responsible for chunking.
pub const DESCRIBE_BATCH_LIMIT: usize = 100;

/// Read-only view of an orchestrator's live state.
///
/// List operations return the complete set (all pages) or fail; there is no
/// partial success. Implementations do not retry.
#[async_trait]
pub trait QueryPort: Send + Sync {
    async fn list_nodes(&self, cluster: &str) -> Result<Vec<NodeRef>>;

    async fn describe_nodes(&self, cluster: &str, refs: &[NodeRef]) -> Result<Vec<NodeDetail>>;

    async fn list_tasks(&self, cluster: &str, node: &NodeRef) -> Result<Vec<TaskRef>>;

    /// `refs` must hold at most [`DESCRIBE_BATCH_LIMIT`] entries. Results are
    /// not required to follow input order.
    async fn describe_tasks(&self, cluster: &str, refs: &[TaskRef]) -> Result<Vec<TaskDetail>>;

    async fn describe_template(&self, template_id: &str) -> Result<Template>;
}
