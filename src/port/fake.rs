//! In-memory `QueryPort` used by the unit tests. It records every call so
//! tests can assert on batching and cache behaviour.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{NodeDetail, NodeRef, QueryPort, ResourceAmount, TaskDetail, TaskRef, Template, Usage};
use crate::error::{Result, UpstreamError};

#[derive(Default)]
pub struct FakePort {
    nodes: Vec<NodeDetail>,
    tasks: HashMap<NodeRef, Vec<TaskDetail>>,
    templates: HashMap<String, Template>,
    template_delay: Option<Duration>,
    strict_templates: bool,
    failing_templates: Mutex<HashSet<String>>,
    failing_nodes: HashSet<NodeRef>,
    short_describe: bool,

    pub template_calls: Mutex<HashMap<String, usize>>,
    pub node_batches: Mutex<Vec<usize>>,
    pub task_batches: Mutex<Vec<usize>>,
}

fn fake_error(reason: &str) -> crate::error::Error {
    UpstreamError::ErrorDecodingResponse {
        endpoint: "fake".to_string(),
        reason: reason.to_string(),
    }
    .into()
}

fn amounts(usage: Usage) -> Vec<ResourceAmount> {
    vec![
        ResourceAmount::new("CPU", usage.cpu),
        ResourceAmount::new("MEMORY", usage.memory),
    ]
}

impl FakePort {
    pub fn new() -> Self {
        FakePort::default()
    }

    pub fn node(mut self, name: &str, registered: Usage, remaining: Usage) -> Self {
        let node_ref = NodeRef(format!("ref/{}", name));
        self.nodes.push(NodeDetail {
            node_ref: node_ref.clone(),
            name: name.to_string(),
            registered: amounts(registered),
            remaining: amounts(remaining),
        });
        self.tasks.entry(node_ref).or_default();
        self
    }

    pub fn task(mut self, node: &str, task_id: &str, template_id: &str) -> Self {
        let node_ref = NodeRef(format!("ref/{}", node));
        self.tasks.entry(node_ref).or_default().push(TaskDetail {
            task_ref: TaskRef(task_id.to_string()),
            template_id: template_id.to_string(),
        });
        self
    }

    pub fn template(mut self, id: &str, cpu: f64, soft_memory: f64, hard_memory: f64) -> Self {
        self.templates.insert(
            id.to_string(),
            Template {
                name: id.to_string(),
                cpu,
                soft_memory,
                hard_memory,
            },
        );
        self
    }

    /// Fail any second describe call for a template id that was already
    /// described once.
    pub fn strict_templates(mut self) -> Self {
        self.strict_templates = true;
        self
    }

    pub fn template_delay(mut self, delay: Duration) -> Self {
        self.template_delay = Some(delay);
        self
    }

    pub fn failing_template(self, id: &str) -> Self {
        self.failing_templates
            .lock()
            .expect("fake port lock")
            .insert(id.to_string());
        self
    }

    pub fn recover_template(&self, id: &str) {
        self.failing_templates
            .lock()
            .expect("fake port lock")
            .remove(id);
    }

    pub fn failing_node(mut self, name: &str) -> Self {
        self.failing_nodes.insert(NodeRef(format!("ref/{}", name)));
        self
    }

    /// Make describe_nodes drop the last node of each batch.
    pub fn short_describe(mut self) -> Self {
        self.short_describe = true;
        self
    }

    pub fn calls_for(&self, template_id: &str) -> usize {
        let calls = self.template_calls.lock().expect("fake port lock");
        calls.get(template_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl QueryPort for FakePort {
    async fn list_nodes(&self, _cluster: &str) -> Result<Vec<NodeRef>> {
        Ok(self.nodes.iter().map(|n| n.node_ref.clone()).collect())
    }

    async fn describe_nodes(&self, _cluster: &str, refs: &[NodeRef]) -> Result<Vec<NodeDetail>> {
        self.node_batches.lock().expect("fake port lock").push(refs.len());
        let mut details: Vec<NodeDetail> = self
            .nodes
            .iter()
            .filter(|n| refs.contains(&n.node_ref))
            .cloned()
            .collect();
        if self.short_describe {
            details.pop();
        }
        Ok(details)
    }

    async fn list_tasks(&self, _cluster: &str, node: &NodeRef) -> Result<Vec<TaskRef>> {
        if self.failing_nodes.contains(node) {
            return Err(fake_error("list tasks failed"));
        }
        let tasks = self.tasks.get(node).cloned().unwrap_or_default();
        Ok(tasks.into_iter().map(|t| t.task_ref).collect())
    }

    async fn describe_tasks(&self, _cluster: &str, refs: &[TaskRef]) -> Result<Vec<TaskDetail>> {
        if refs.len() > super::DESCRIBE_BATCH_LIMIT {
            return Err(fake_error("too many tasks in one describe call"));
        }
        self.task_batches.lock().expect("fake port lock").push(refs.len());
        let details = self
            .tasks
            .values()
            .flatten()
            .filter(|t| refs.contains(&t.task_ref))
            .cloned()
            .collect();
        Ok(details)
    }

    async fn describe_template(&self, template_id: &str) -> Result<Template> {
        let previous = {
            let mut calls = self.template_calls.lock().expect("fake port lock");
            let count = calls.entry(template_id.to_string()).or_insert(0);
            *count += 1;
            *count - 1
        };
        if let Some(delay) = self.template_delay {
            tokio::time::sleep(delay).await;
        }
        if self.strict_templates && previous > 0 {
            return Err(fake_error("template described twice"));
        }
        if self
            .failing_templates
            .lock()
            .expect("fake port lock")
            .contains(template_id)
        {
            return Err(fake_error("template lookup failed"));
        }
        self.templates
            .get(template_id)
            .cloned()
            .ok_or_else(|| fake_error("no such template"))
    }
}
