use super::resource_node::{ResourceNode, UNUSED};
use crate::port::{Template, Usage};

/// How memory figures are mapped onto the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryModel {
    /// One memory figure per task (the allocation/limit), written to `memory`.
    Single,
    /// Reservation and limit tracked apart: usage goes to `soft_memory`,
    /// limits are summed into `max_memory`.
    SoftHard,
}

impl MemoryModel {
    pub fn task_leaf(self, template: &Template) -> ResourceNode {
        let mut leaf = ResourceNode {
            cpu: template.cpu,
            ..ResourceNode::named(&template.name)
        };
        match self {
            MemoryModel::Single => leaf.memory = template.hard_memory,
            MemoryModel::SoftHard => {
                leaf.soft_memory = template.soft_memory;
                leaf.max_memory = template.hard_memory;
            }
        }
        leaf
    }

    pub fn unused_leaf(self, remaining: Usage) -> ResourceNode {
        let mut leaf = ResourceNode {
            cpu: remaining.cpu,
            ..ResourceNode::named(UNUSED)
        };
        self.set_memory(&mut leaf, remaining.memory);
        leaf
    }

    /// Fills usage and capacity of an inner node (host or cluster root).
    pub fn fill_totals(
        self,
        node: &mut ResourceNode,
        usable: Usage,
        used: Usage,
        max_memory: f64,
    ) {
        node.cpu = used.cpu;
        node.cpu_total = usable.cpu;
        node.memory_total = usable.memory;
        self.set_memory(node, used.memory);
        if self == MemoryModel::SoftHard {
            node.max_memory = max_memory;
        }
    }

    /// The memory figure this model accounts usage with.
    pub fn memory_of(self, node: &ResourceNode) -> f64 {
        match self {
            MemoryModel::Single => node.memory,
            MemoryModel::SoftHard => node.soft_memory,
        }
    }

    fn set_memory(self, node: &mut ResourceNode, value: f64) {
        match self {
            MemoryModel::Single => node.memory = value,
            MemoryModel::SoftHard => node.soft_memory = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> Template {
        Template {
            name: "worker".to_string(),
            cpu: 512.0,
            soft_memory: 256.0,
            hard_memory: 1024.0,
        }
    }

    #[test]
    fn single_model_uses_hard_memory() {
        let leaf = MemoryModel::Single.task_leaf(&template());
        assert_eq!(leaf.memory, 1024.0);
        assert_eq!(leaf.soft_memory, 0.0);
        assert_eq!(leaf.max_memory, 0.0);
    }

    #[test]
    fn soft_hard_model_splits_memory() {
        let leaf = MemoryModel::SoftHard.task_leaf(&template());
        assert_eq!(leaf.soft_memory, 256.0);
        assert_eq!(leaf.max_memory, 1024.0);
        assert_eq!(leaf.memory, 0.0);
    }

    #[test]
    fn single_model_ignores_max_memory_total() {
        let mut node = ResourceNode::named("host");
        MemoryModel::Single.fill_totals(&mut node, Usage::new(4.0, 8.0), Usage::new(3.0, 6.0), 99.0);
        assert_eq!(node.max_memory, 0.0);
        assert_eq!(MemoryModel::Single.memory_of(&node), 6.0);
    }
}
