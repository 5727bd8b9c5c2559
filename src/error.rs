use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Upstream hiccup worth retrying (5xx, connect failure, timeout).
    #[error("transient upstream failure: {0}")]
    TransientUpstream(String),

    /// The upstream told us to slow down.
    #[error("upstream rate limit hit")]
    UpstreamRateLimited,

    /// Upstream rejected the request for good (4xx, malformed body).
    #[error("permanent upstream failure: {0}")]
    PermanentUpstream(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// The pre-merge snapshot could not be taken. The master dataset is
    /// untouched when this is returned.
    #[error("backup failed: {0}")]
    Backup(#[source] io::Error),

    /// The master dataset does not look like ours. When a backup was taken
    /// before the check, its path is carried along.
    #[error("master dataset integrity: {reason}")]
    MergeIntegrity {
        reason: String,
        backup: Option<PathBuf>,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Whether a retry with backoff makes sense.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::TransientUpstream(_) | Error::UpstreamRateLimited)
    }
}
