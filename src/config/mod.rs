mod config;

pub use config::{parse_clusters, ClusterMap, Config, Orchestrator};
