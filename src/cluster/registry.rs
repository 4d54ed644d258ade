use std::sync::Arc;

use tracing::info;

use crate::cache::TemplateCache;
use crate::config::{Config, Orchestrator};
use crate::ecs;
use crate::error::{Error, Result};
use crate::graph::{Engine, MemoryModel, ResourceNode};
use crate::mesos;

pub enum Backend {
    /// ECS template ids are task definition revisions, reused by every task
    /// launched from them, so their cache lives as long as the process.
    Ecs {
        client: Arc<ecs::Client>,
        cluster_id: String,
        cache: TemplateCache,
    },
    /// Mesos templates are per-task; each snapshot carries its own cache.
    Mesos(mesos::Client),
}

/// A configured cluster.
pub struct Cluster {
    pub name: String,
    backend: Backend,
}

impl Cluster {
    pub fn ecs(name: &str, client: Arc<ecs::Client>, cluster_id: &str) -> Self {
        Cluster {
            name: name.to_string(),
            backend: Backend::Ecs {
                client,
                cluster_id: cluster_id.to_string(),
                cache: TemplateCache::new(),
            },
        }
    }

    pub fn mesos(name: &str, client: mesos::Client) -> Self {
        Cluster {
            name: name.to_string(),
            backend: Backend::Mesos(client),
        }
    }

    pub async fn resource_graph(&self, concurrency: usize) -> Result<ResourceNode> {
        match &self.backend {
            Backend::Ecs {
                client,
                cluster_id,
                cache,
            } => {
                Engine::new(client.as_ref(), cache, MemoryModel::SoftHard)
                    .with_concurrency(concurrency)
                    .build(cluster_id)
                    .await
            }
            Backend::Mesos(client) => {
                let snapshot = client.snapshot().await?;
                snapshot.resource_graph(&self.name, concurrency).await
            }
        }
    }

    /// Templates kept between requests.
    pub async fn cached_templates(&self) -> usize {
        match &self.backend {
            Backend::Ecs { cache, .. } => cache.len().await,
            Backend::Mesos(_) => 0,
        }
    }
}

/// All clusters this process serves, in configuration order.
pub struct Registry {
    clusters: Vec<Cluster>,
    concurrency: usize,
}

impl Registry {
    pub fn new(clusters: Vec<Cluster>, concurrency: usize) -> Self {
        Registry {
            clusters,
            concurrency: concurrency.max(1),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = config.request_timeout();
        let clusters: Vec<Cluster> = match config.orchestrator {
            Orchestrator::Ecs => {
                let endpoint = config.ecs_endpoint();
                let retry = ecs::RetryPolicy {
                    max_retries: config.ecs_max_retries,
                    ..ecs::RetryPolicy::default()
                };
                let client = Arc::new(
                    ecs::Client::new(&endpoint, &config.aws_region, config.credentials()?, timeout)?
                        .with_retry_policy(retry),
                );
                info!("[REGISTRY] using ECS endpoint {}", endpoint);
                config
                    .clusters
                    .0
                    .iter()
                    .map(|(name, id)| Cluster::ecs(name, client.clone(), id))
                    .collect()
            }
            Orchestrator::Mesos => config
                .clusters
                .0
                .iter()
                .map(|(name, master)| Ok(Cluster::mesos(name, mesos::Client::new(master, timeout)?)))
                .collect::<Result<Vec<_>>>()?,
        };
        Ok(Registry::new(clusters, config.node_concurrency))
    }

    pub fn names(&self) -> Vec<String> {
        self.clusters.iter().map(|c| c.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Result<&Cluster> {
        self.clusters
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::UnknownCluster(name.to_string()))
    }

    pub fn default_cluster(&self) -> Result<&Cluster> {
        self.clusters
            .first()
            .ok_or_else(|| Error::UnknownCluster("<default>".to_string()))
    }

    pub async fn resource_graph(&self, name: &str) -> Result<ResourceNode> {
        self.get(name)?.resource_graph(self.concurrency).await
    }

    pub async fn default_resource_graph(&self) -> Result<ResourceNode> {
        self.default_cluster()?
            .resource_graph(self.concurrency)
            .await
    }
}
