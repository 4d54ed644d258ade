use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

use super::policy::MemoryModel;
use super::resource_node::{ResourceNode, TOTAL};
use crate::cache::TemplateCache;
use crate::error::{Error, Result};
use crate::port::{NodeDetail, QueryPort, TaskDetail, TaskRef, Usage, DESCRIBE_BATCH_LIMIT};

/// Builds the cluster → node → task allocation tree from a `QueryPort`.
///
/// Every failure aborts the whole computation; no partial tree is ever
/// returned.
pub struct Engine<'a, P: QueryPort + ?Sized> {
    port: &'a P,
    cache: &'a TemplateCache,
    model: MemoryModel,
    concurrency: usize,
}

struct NodeSummary {
    node: ResourceNode,
    usable: Usage,
    used: Usage,
    max_memory: f64,
}

impl<'a, P: QueryPort + ?Sized> Engine<'a, P> {
    pub fn new(port: &'a P, cache: &'a TemplateCache, model: MemoryModel) -> Self {
        Engine {
            port,
            cache,
            model,
            concurrency: 1,
        }
    }

    /// Number of nodes processed at once. Children keep discovery order
    /// whatever the value.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn build(&self, cluster: &str) -> Result<ResourceNode> {
        let details = self.discover_nodes(cluster).await?;
        debug!("[ENGINE] {}: discovered {} nodes", cluster, details.len());

        let summaries: Vec<NodeSummary> = stream::iter(details)
            .map(|detail| self.build_node(cluster, detail))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let mut root = ResourceNode::named(TOTAL);
        let mut usable = Usage::default();
        let mut used = Usage::default();
        let mut max_memory = 0.0;
        for summary in summaries {
            usable += summary.usable;
            used += summary.used;
            max_memory += summary.max_memory;
            root.children.push(summary.node);
        }
        self.model.fill_totals(&mut root, usable, used, max_memory);

        info!(
            "[ENGINE] {}: {} nodes, cpu {}/{}, memory {}/{}",
            cluster,
            root.children.len(),
            used.cpu,
            usable.cpu,
            used.memory,
            usable.memory
        );
        Ok(root)
    }

    async fn discover_nodes(&self, cluster: &str) -> Result<Vec<NodeDetail>> {
        let refs = self.port.list_nodes(cluster).await?;
        let mut details = Vec::with_capacity(refs.len());
        for chunk in refs.chunks(DESCRIBE_BATCH_LIMIT) {
            details.extend(self.port.describe_nodes(cluster, chunk).await?);
        }
        if details.len() != refs.len() {
            return Err(Error::Consistency(format!(
                "described {} node refs but got {} node details back",
                refs.len(),
                details.len()
            )));
        }
        Ok(details)
    }

    async fn describe_tasks(&self, cluster: &str, refs: &[TaskRef]) -> Result<Vec<TaskDetail>> {
        let mut tasks = Vec::with_capacity(refs.len());
        for chunk in refs.chunks(DESCRIBE_BATCH_LIMIT) {
            tasks.extend(self.port.describe_tasks(cluster, chunk).await?);
        }
        Ok(tasks)
    }

    async fn build_node(&self, cluster: &str, detail: NodeDetail) -> Result<NodeSummary> {
        let usable = Usage::from_amounts(&detail.registered);
        let remaining = Usage::from_amounts(&detail.remaining);
        // may go negative when the upstream reports more remaining than registered
        let used = usable - remaining;

        let task_refs = self.port.list_tasks(cluster, &detail.node_ref).await?;
        let tasks = self.describe_tasks(cluster, &task_refs).await?;

        let mut node = ResourceNode::named(&detail.name);
        let mut max_memory = 0.0;
        for task in &tasks {
            let template = self.cache.get(&task.template_id, self.port).await?;
            max_memory += template.hard_memory;
            node.children.push(self.model.task_leaf(&template));
        }
        // slack comes from the node's own counters, not from the task sums
        node.children.push(self.model.unused_leaf(remaining));
        self.model.fill_totals(&mut node, usable, used, max_memory);

        debug!(
            "[ENGINE] node {} ({}): {} tasks, used cpu {} memory {}",
            detail.name,
            detail.node_ref,
            tasks.len(),
            used.cpu,
            used.memory
        );
        Ok(NodeSummary {
            node,
            usable,
            used,
            max_memory,
        })
    }
}
