mod registry;

pub use registry::{Backend, Cluster, Registry};
