use serde::Serialize;

/// Name of the synthetic leaf holding a node's unallocated capacity.
pub const UNUSED: &str = "Unused";

/// Name of the cluster root.
pub const TOTAL: &str = "Total";

/// One node of the allocation tree handed to the front end.
///
/// Numeric fields left at zero are not serialized, and leaves carry no
/// `children` key.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ResourceNode {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ResourceNode>,
    #[serde(skip_serializing_if = "is_zero")]
    pub cpu: f64,
    #[serde(skip_serializing_if = "is_zero")]
    pub memory: f64,
    #[serde(skip_serializing_if = "is_zero")]
    pub soft_memory: f64,
    #[serde(skip_serializing_if = "is_zero")]
    pub max_memory: f64,
    #[serde(skip_serializing_if = "is_zero")]
    pub cpu_total: f64,
    #[serde(skip_serializing_if = "is_zero")]
    pub memory_total: f64,
}

fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

impl ResourceNode {
    pub fn named(name: &str) -> Self {
        ResourceNode {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// The synthetic slack leaf, when this node has one.
    pub fn unused(&self) -> Option<&ResourceNode> {
        self.children.iter().rev().find(|c| c.name == UNUSED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leaf_omits_children_and_zero_fields() {
        let leaf = ResourceNode {
            cpu: 256.0,
            soft_memory: 512.0,
            ..ResourceNode::named("api")
        };
        let value = serde_json::to_value(&leaf).unwrap();
        assert_eq!(value, json!({"name": "api", "cpu": 256.0, "soft_memory": 512.0}));
    }

    #[test]
    fn negative_values_are_serialized() {
        let node = ResourceNode {
            cpu: -1.0,
            memory: -2048.0,
            cpu_total: 4.0,
            memory_total: 8192.0,
            children: vec![ResourceNode::named(UNUSED)],
            ..ResourceNode::named("host-a")
        };
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "host-a",
                "children": [{"name": "Unused"}],
                "cpu": -1.0,
                "memory": -2048.0,
                "cpu_total": 4.0,
                "memory_total": 8192.0
            })
        );
    }

    #[test]
    fn unused_finds_the_slack_leaf() {
        let node = ResourceNode {
            children: vec![
                ResourceNode::named("web"),
                ResourceNode { cpu: 1.0, ..ResourceNode::named(UNUSED) },
            ],
            ..ResourceNode::named("host-a")
        };
        assert_eq!(node.unused().map(|u| u.cpu), Some(1.0));
    }
}
