pub mod api;
pub mod cache;
pub mod cluster;
pub mod config;
pub mod ecs;
pub mod error;
pub mod graph;
pub mod mesos;
pub mod port;
