mod port;
mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use port::{QueryPort, DESCRIBE_BATCH_LIMIT};
pub use types::{
    NodeDetail, NodeRef, ResourceAmount, ResourceKind, TaskDetail, TaskRef, Template, Usage,
};
