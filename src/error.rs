use thiserror::Error;

/// Failures reaching or understanding the orchestrator.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("error reaching {endpoint}: {source}")]
    ErrorReachingUpstream {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} answered {status}: {body}")]
    StatusCodeError {
        endpoint: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("error decoding response from {endpoint}: {reason}")]
    ErrorDecodingResponse { endpoint: String, reason: String },

    #[error("leader {0:?} does not start with \"master@\"")]
    InvalidLeader(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("consistency check failed: {0}")]
    Consistency(String),

    #[error("unknown cluster: {0}")]
    UnknownCluster(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
