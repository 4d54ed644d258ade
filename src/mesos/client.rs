use std::time::Duration;

use tracing::{debug, info};

use super::snapshot::Snapshot;
use super::state::State;
use crate::error::{Error, Result, UpstreamError};

const STATE_PATH: &str = "/state.json";

/// Reads cluster state from a Mesos master.
pub struct Client {
    client: reqwest::Client,
    master: String,
}

impl Client {
    /// `master` is any master's `host:port`; reads are redirected to the
    /// elected leader.
    pub fn new(master: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Client {
            client,
            master: master.to_string(),
        })
    }

    /// Asks the configured master who leads, then reads the leader's own
    /// state. Only the leader's snapshot is trusted.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let state = self.get_state(&self.master).await?;
        let leader = state.leader_address()?;
        info!("[MESOS] {} reports leader {}", self.master, leader);

        let state = self.get_state(leader).await?;
        Ok(Snapshot::new(state))
    }

    async fn get_state(&self, host: &str) -> Result<State> {
        let url = format!("http://{}{}", host, STATE_PATH);
        debug!("[MESOS] fetching {}", url);

        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| UpstreamError::ErrorReachingUpstream {
                endpoint: url.clone(),
                source,
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(UpstreamError::StatusCodeError {
                endpoint: url,
                status,
                body,
            }
            .into());
        }

        res.json::<State>().await.map_err(|e| {
            UpstreamError::ErrorDecodingResponse {
                endpoint: url,
                reason: e.to_string(),
            }
            .into()
        })
    }
}
