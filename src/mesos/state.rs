use serde::Deserialize;

use crate::error::{Result, UpstreamError};

const LEADER_PREFIX: &str = "master@";

pub const TASK_RUNNING: &str = "TASK_RUNNING";

/// Subset of the master's `state.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct State {
    #[serde(default)]
    pub leader: String,
    #[serde(default)]
    pub slaves: Vec<Slave>,
    #[serde(default)]
    pub frameworks: Vec<Framework>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Slave {
    pub id: String,
    pub hostname: String,
    #[serde(default)]
    pub resources: Resources,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Resources {
    #[serde(default)]
    pub cpus: f64,
    #[serde(default)]
    pub mem: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Framework {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub slave_id: String,
    pub state: String,
    #[serde(default)]
    pub resources: Resources,
}

impl State {
    /// Address of the elected master, from `leader` = `master@host:port`.
    pub fn leader_address(&self) -> Result<&str> {
        self.leader
            .strip_prefix(LEADER_PREFIX)
            .filter(|address| !address.is_empty())
            .ok_or_else(|| UpstreamError::InvalidLeader(self.leader.clone()).into())
    }

    pub fn running_tasks(&self) -> impl Iterator<Item = &Task> {
        self.frameworks
            .iter()
            .flat_map(|f| f.tasks.iter())
            .filter(|t| t.state == TASK_RUNNING)
    }
}
