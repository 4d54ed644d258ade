use std::fmt::{self, Display, Formatter};
use std::ops::{Add, AddAssign, Sub};

/// Opaque identifier of a node as the orchestrator knows it
/// (container instance ARN, Mesos slave id).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef(pub String);

/// Opaque identifier of a running task (task ARN, Mesos task id).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskRef(pub String);

impl Display for NodeRef {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for TaskRef {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Cpu,
    Memory,
}

impl ResourceKind {
    /// Maps an orchestrator resource name to a kind. Names we do not
    /// account for (ports, disk, gpus...) yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "CPU" | "cpus" => Some(ResourceKind::Cpu),
            "MEMORY" | "mem" => Some(ResourceKind::Memory),
            _ => None,
        }
    }
}

/// A single key/value capacity entry reported for a node.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceAmount {
    pub name: String,
    pub value: f64,
}

impl ResourceAmount {
    pub fn new(name: &str, value: f64) -> Self {
        ResourceAmount {
            name: name.to_string(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeDetail {
    pub node_ref: NodeRef,
    /// Host identifier shown in the graph.
    pub name: String,
    pub registered: Vec<ResourceAmount>,
    pub remaining: Vec<ResourceAmount>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskDetail {
    pub task_ref: TaskRef,
    pub template_id: String,
}

/// Immutable resource request of a task template.
///
/// `soft_memory` is the reservation used for scheduling, `hard_memory`
/// the enforced limit. Orchestrators with a single memory figure report
/// the same value in both.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    pub name: String,
    pub cpu: f64,
    pub soft_memory: f64,
    pub hard_memory: f64,
}

/// A cpu/memory pair. Values are signed on purpose: `used` is derived as
/// registered minus remaining and is never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Usage {
    pub cpu: f64,
    pub memory: f64,
}

impl Usage {
    pub fn new(cpu: f64, memory: f64) -> Self {
        Usage { cpu, memory }
    }

    /// Sums the amounts per kind, ignoring unknown resource names.
    pub fn from_amounts(amounts: &[ResourceAmount]) -> Self {
        let mut usage = Usage::default();
        for amount in amounts {
            match ResourceKind::parse(&amount.name) {
                Some(ResourceKind::Cpu) => usage.cpu += amount.value,
                Some(ResourceKind::Memory) => usage.memory += amount.value,
                None => {}
            }
        }
        usage
    }
}

impl Add for Usage {
    type Output = Usage;

    fn add(self, rhs: Usage) -> Usage {
        Usage::new(self.cpu + rhs.cpu, self.memory + rhs.memory)
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, rhs: Usage) {
        self.cpu += rhs.cpu;
        self.memory += rhs.memory;
    }
}

impl Sub for Usage {
    type Output = Usage;

    fn sub(self, rhs: Usage) -> Usage {
        Usage::new(self.cpu - rhs.cpu, self.memory - rhs.memory)
    }
}
