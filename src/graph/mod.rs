mod engine;
mod policy;
mod resource_node;

pub use engine::Engine;
pub use policy::MemoryModel;
pub use resource_node::{ResourceNode, TOTAL, UNUSED};
