use std::collections::HashMap;
use std::ops::{Add, Sub};

use async_trait::async_trait;

use super::state::{Resources, State};
use crate::cache::TemplateCache;
use crate::error::{Error, Result};
use crate::graph::{Engine, MemoryModel, ResourceNode};
use crate::port::{NodeDetail, NodeRef, QueryPort, ResourceAmount, TaskDetail, TaskRef, Template};

/// Scalars in thousandths. The master rounds resources to three decimals,
/// so remaining = registered - tasks is exact here and the values handed to
/// the tree are the nearest doubles to the master's figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Milli {
    cpus: i64,
    mem: i64,
}

fn to_milli(value: f64) -> i64 {
    (value * 1000.0).round() as i64
}

fn from_milli(value: i64) -> f64 {
    value as f64 / 1000.0
}

impl From<Resources> for Milli {
    fn from(resources: Resources) -> Self {
        Milli {
            cpus: to_milli(resources.cpus),
            mem: to_milli(resources.mem),
        }
    }
}

impl Add for Milli {
    type Output = Milli;

    fn add(self, rhs: Milli) -> Milli {
        Milli {
            cpus: self.cpus + rhs.cpus,
            mem: self.mem + rhs.mem,
        }
    }
}

impl Sub for Milli {
    type Output = Milli;

    fn sub(self, rhs: Milli) -> Milli {
        Milli {
            cpus: self.cpus - rhs.cpus,
            mem: self.mem - rhs.mem,
        }
    }
}

impl Milli {
    fn amounts(self) -> Vec<ResourceAmount> {
        vec![
            ResourceAmount::new("cpus", from_milli(self.cpus)),
            ResourceAmount::new("mem", from_milli(self.mem)),
        ]
    }
}

/// One leader `state.json`, exposed as a `QueryPort`.
///
/// The master reports no remaining capacity per slave, so remaining is the
/// slave's resources minus its running tasks. Each task is its own
/// template: the template id is the task id. Task ids do not outlive the
/// task, so the template cache lives and dies with the snapshot.
#[derive(Debug)]
pub struct Snapshot {
    nodes: Vec<NodeDetail>,
    node_index: HashMap<String, usize>,
    tasks_by_slave: HashMap<String, Vec<TaskRef>>,
    templates: HashMap<String, Template>,
    cache: TemplateCache,
}

impl Snapshot {
    pub fn new(state: State) -> Self {
        let mut tasks_by_slave: HashMap<String, Vec<TaskRef>> = HashMap::new();
        let mut used_by_slave: HashMap<&str, Milli> = HashMap::new();
        let mut templates = HashMap::new();
        for task in state.running_tasks() {
            let used = Milli::from(task.resources);
            let slot = used_by_slave.entry(task.slave_id.as_str()).or_default();
            *slot = *slot + used;
            tasks_by_slave
                .entry(task.slave_id.clone())
                .or_default()
                .push(TaskRef(task.id.clone()));
            templates.insert(
                task.id.clone(),
                Template {
                    name: task.name.clone(),
                    cpu: from_milli(used.cpus),
                    soft_memory: from_milli(used.mem),
                    hard_memory: from_milli(used.mem),
                },
            );
        }

        let nodes: Vec<NodeDetail> = state
            .slaves
            .iter()
            .map(|slave| {
                let registered = Milli::from(slave.resources);
                let used = used_by_slave.get(slave.id.as_str()).copied().unwrap_or_default();
                NodeDetail {
                    node_ref: NodeRef(slave.id.clone()),
                    name: slave.hostname.clone(),
                    registered: registered.amounts(),
                    remaining: (registered - used).amounts(),
                }
            })
            .collect();
        let node_index = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.node_ref.0.clone(), i))
            .collect();

        Snapshot {
            nodes,
            node_index,
            tasks_by_slave,
            templates,
            cache: TemplateCache::new(),
        }
    }

    pub async fn resource_graph(&self, cluster: &str, concurrency: usize) -> Result<ResourceNode> {
        Engine::new(self, &self.cache, MemoryModel::Single)
            .with_concurrency(concurrency)
            .build(cluster)
            .await
    }

    pub async fn cached_templates(&self) -> usize {
        self.cache.len().await
    }
}

#[async_trait]
impl QueryPort for Snapshot {
    async fn list_nodes(&self, _cluster: &str) -> Result<Vec<NodeRef>> {
        Ok(self.nodes.iter().map(|n| n.node_ref.clone()).collect())
    }

    async fn describe_nodes(&self, _cluster: &str, refs: &[NodeRef]) -> Result<Vec<NodeDetail>> {
        Ok(refs
            .iter()
            .filter_map(|r| self.node_index.get(&r.0))
            .map(|&i| self.nodes[i].clone())
            .collect())
    }

    async fn list_tasks(&self, _cluster: &str, node: &NodeRef) -> Result<Vec<TaskRef>> {
        Ok(self.tasks_by_slave.get(&node.0).cloned().unwrap_or_default())
    }

    async fn describe_tasks(&self, _cluster: &str, refs: &[TaskRef]) -> Result<Vec<TaskDetail>> {
        Ok(refs
            .iter()
            .map(|r| TaskDetail {
                task_ref: r.clone(),
                template_id: r.0.clone(),
            })
            .collect())
    }

    async fn describe_template(&self, template_id: &str) -> Result<Template> {
        self.templates.get(template_id).cloned().ok_or_else(|| {
            Error::Consistency(format!("task {} is not part of the snapshot", template_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use serde_json::{json, Value};

    use super::*;
    use crate::graph::UNUSED;

    fn state() -> State {
        serde_json::from_value(json!({
            "leader": "master@m1:5050",
            "slaves": [
                {"id": "S1", "hostname": "agent-1", "resources": {"cpus": 4.0, "mem": 8192}},
                {"id": "S2", "hostname": "agent-2", "resources": {"cpus": 2.0, "mem": 4096}}
            ],
            "frameworks": [{"id": "F1", "tasks": [
                {"id": "a.1", "name": "a", "slave_id": "S1", "state": "TASK_RUNNING",
                 "resources": {"cpus": 1.0, "mem": 2048}},
                {"id": "b.1", "name": "b", "slave_id": "S1", "state": "TASK_RUNNING",
                 "resources": {"cpus": 2.0, "mem": 4096}},
                {"id": "c.1", "name": "c", "slave_id": "S2", "state": "TASK_FINISHED",
                 "resources": {"cpus": 2.0, "mem": 4096}}
            ]}]
        }))
        .unwrap()
    }

    /// One slave with `cpus`/`mem` and running tasks of the given sizes.
    fn single_slave(cpus: f64, mem: f64, tasks: &[(&str, f64, f64)]) -> State {
        let tasks: Vec<Value> = tasks
            .iter()
            .map(|(id, cpus, mem)| {
                json!({"id": id, "name": "job", "slave_id": "S1", "state": "TASK_RUNNING",
                       "resources": {"cpus": cpus, "mem": mem}})
            })
            .collect();
        serde_json::from_value(json!({
            "slaves": [{"id": "S1", "hostname": "agent-1", "resources": {"cpus": cpus, "mem": mem}}],
            "frameworks": [{"id": "F1", "tasks": tasks}]
        }))
        .unwrap()
    }

    /// Checks, in thousandths, that children add up to the node's capacity
    /// and that every figure is exactly the master's three-decimal value.
    fn assert_closes(node: &ResourceNode) {
        let exact = |v: f64| from_milli(to_milli(v)) == v;
        let mut cpus = 0;
        let mut mem = 0;
        for child in &node.children {
            assert!(exact(child.cpu), "{} cpu {} on {}", child.name, child.cpu, node.name);
            assert!(exact(child.memory), "{} memory {} on {}", child.name, child.memory, node.name);
            cpus += to_milli(child.cpu);
            mem += to_milli(child.memory);
        }
        assert_eq!(cpus, to_milli(node.cpu_total), "cpu closure on {}", node.name);
        assert_eq!(mem, to_milli(node.memory_total), "memory closure on {}", node.name);
    }

    #[tokio::test]
    async fn remaining_subtracts_running_tasks() {
        let snapshot = Snapshot::new(state());
        let refs = snapshot.list_nodes("").await.unwrap();
        let details = snapshot.describe_nodes("", &refs).await.unwrap();

        assert_eq!(details.len(), 2);
        assert_eq!(details[0].name, "agent-1");
        assert_eq!(
            details[0].remaining,
            vec![ResourceAmount::new("cpus", 1.0), ResourceAmount::new("mem", 2048.0)]
        );
        // finished tasks hold no resources
        assert_eq!(details[1].remaining, details[1].registered);
    }

    #[tokio::test]
    async fn unknown_template_is_a_consistency_error() {
        let snapshot = Snapshot::new(state());
        let err = snapshot.describe_template("c.1").await.unwrap_err();
        assert!(matches!(err, Error::Consistency(_)));
    }

    #[tokio::test]
    async fn graph_over_snapshot_closes_capacity() {
        let snapshot = Snapshot::new(state());
        let root = snapshot.resource_graph("mesos", 1).await.unwrap();

        let agent = &root.children[0];
        assert_eq!(agent.cpu, 3.0);
        assert_eq!(agent.memory, 6144.0);
        assert_eq!(agent.children.len(), 3);
        let unused = agent.unused().unwrap();
        assert_eq!((unused.cpu, unused.memory), (1.0, 2048.0));

        let idle = &root.children[1];
        assert_eq!(idle.children.len(), 1);
        assert_eq!(idle.unused().unwrap().cpu, 2.0);

        assert_eq!(root.cpu_total, 6.0);
        assert_eq!(root.memory_total, 12288.0);
        assert_eq!(root.cpu, 3.0);
    }

    #[tokio::test]
    async fn decimal_cpus_leave_exact_unused() {
        let snapshot = Snapshot::new(single_slave(
            1.0,
            1024.0,
            &[("t.1", 0.1, 100.1), ("t.2", 0.3, 200.2), ("t.3", 0.2, 300.3)],
        ));
        let root = snapshot.resource_graph("mesos", 1).await.unwrap();

        let node = &root.children[0];
        let unused = node.unused().unwrap();
        assert_eq!(unused.name, UNUSED);
        assert_eq!(unused.cpu, 0.4);
        assert_eq!(unused.memory, 423.4);
        assert_closes(node);
    }

    #[tokio::test]
    async fn decimal_capacity_closes_on_random_snapshots() {
        let mut rng = StdRng::seed_from_u64(0xdec1);

        for _ in 0..200 {
            let mut tasks = Vec::new();
            let mut used = (0i64, 0i64);
            for t in 0..rng.gen_range(0..6) {
                let cpus = rng.gen_range(1..=2500);
                let mem = rng.gen_range(1..=4_000_000);
                used = (used.0 + cpus, used.1 + mem);
                tasks.push((format!("t.{}", t), from_milli(cpus), from_milli(mem)));
            }
            let cpus = from_milli(used.0 + rng.gen_range(0..=4000));
            let mem = from_milli(used.1 + rng.gen_range(0..=8_000_000));
            let tasks: Vec<(&str, f64, f64)> =
                tasks.iter().map(|(id, c, m)| (id.as_str(), *c, *m)).collect();

            let snapshot = Snapshot::new(single_slave(cpus, mem, &tasks));
            let root = snapshot.resource_graph("mesos", 1).await.unwrap();

            assert_eq!(root.children.len(), 1);
            assert_closes(&root.children[0]);
        }
    }

    #[tokio::test]
    async fn template_cache_does_not_outlive_the_snapshot() {
        for round in 0..50 {
            let ids: Vec<String> = (0..3).map(|t| format!("job.{}.{}", round, t)).collect();
            let tasks: Vec<(&str, f64, f64)> = ids.iter().map(|id| (id.as_str(), 0.5, 128.0)).collect();
            let snapshot = Snapshot::new(single_slave(4.0, 1024.0, &tasks));

            snapshot.resource_graph("mesos", 2).await.unwrap();

            assert_eq!(snapshot.cached_templates().await, 3);
        }
    }
}
