use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::ecs::Credentials;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Orchestrator {
    /// Amazon ECS container instances and task definitions.
    Ecs,
    /// Mesos master state.
    Mesos,
}

/// Ordered `name -> identifier` pairs. The first entry is the default
/// cluster served on `/resources.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterMap(pub Vec<(String, String)>);

/// Parses `name=identifier[,name=identifier...]`.
pub fn parse_clusters(raw: &str) -> std::result::Result<ClusterMap, String> {
    let mut clusters: Vec<(String, String)> = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, identifier) = entry
            .split_once('=')
            .ok_or_else(|| format!("expected name=identifier, got {:?}", entry))?;
        let (name, identifier) = (name.trim(), identifier.trim());
        if name.is_empty() || identifier.is_empty() {
            return Err(format!("empty name or identifier in {:?}", entry));
        }
        if clusters.iter().any(|(n, _)| n == name) {
            return Err(format!("cluster {:?} is listed twice", name));
        }
        clusters.push((name.to_string(), identifier.to_string()));
    }
    if clusters.is_empty() {
        return Err("at least one cluster is required".to_string());
    }
    Ok(ClusterMap(clusters))
}

#[derive(Debug, Clone, Parser)]
#[command(name = "resgraph", version, about = "Serves the CPU/memory allocation tree of a cluster")]
pub struct Config {
    #[arg(long, env = "ORCHESTRATOR", value_enum)]
    pub orchestrator: Orchestrator,

    /// name=identifier pairs; ECS cluster name/ARN or Mesos master host:port.
    #[arg(long, env = "CLUSTERS", value_parser = parse_clusters)]
    pub clusters: ClusterMap,

    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8888")]
    pub listen: String,

    #[arg(long, env = "AWS_REGION", default_value = "us-west-1")]
    pub aws_region: String,

    #[arg(long, env = "AWS_ACCESS_KEY_ID")]
    pub aws_access_key_id: Option<String>,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub aws_secret_access_key: Option<String>,

    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    pub aws_session_token: Option<String>,

    /// Overrides https://ecs.<region>.amazonaws.com/
    #[arg(long, env = "ECS_ENDPOINT")]
    pub ecs_endpoint: Option<String>,

    /// Retries for throttled, 5xx or unreachable ECS calls.
    #[arg(long, env = "ECS_MAX_RETRIES", default_value_t = 10)]
    pub ecs_max_retries: u32,

    /// Nodes processed at once per request.
    #[arg(long, env = "NODE_CONCURRENCY", default_value_t = 4)]
    pub node_concurrency: usize,

    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Directory with the front end, served on every other path.
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,
}

impl Config {
    /// Checks the combinations clap cannot express. Called once at startup;
    /// any error is fatal.
    pub fn validate(&self) -> Result<()> {
        if self.node_concurrency == 0 {
            return Err(Error::Config("NODE_CONCURRENCY must be at least 1".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("REQUEST_TIMEOUT_SECS must be at least 1".to_string()));
        }
        if self.orchestrator == Orchestrator::Ecs {
            self.credentials()?;
        }
        Ok(())
    }

    pub fn credentials(&self) -> Result<Credentials> {
        let missing = |var: &str| Error::Config(format!("Must specify env variable {}", var));
        Ok(Credentials {
            access_key_id: self
                .aws_access_key_id
                .clone()
                .ok_or_else(|| missing("AWS_ACCESS_KEY_ID"))?,
            secret_access_key: self
                .aws_secret_access_key
                .clone()
                .ok_or_else(|| missing("AWS_SECRET_ACCESS_KEY"))?,
            session_token: self.aws_session_token.clone(),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn ecs_endpoint(&self) -> String {
        self.ecs_endpoint
            .clone()
            .unwrap_or_else(|| crate::ecs::Client::regional_endpoint(&self.aws_region))
    }
}
