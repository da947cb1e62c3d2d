use std::path::PathBuf;

use thiserror::Error;
use upkeep_core::{DownloadError, FetchError};

#[derive(Debug, Error)]
pub enum UpdaterError {
    #[error("error updating {} from {url}: {source}", .target.display())]
    Update {
        url: String,
        target: PathBuf,
        #[source]
        source: DownloadError,
    },
    #[error("update availability check against {url} failed: {source}")]
    Check {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("{operation} task did not complete: {source}")]
    Task {
        operation: &'static str,
        #[source]
        source: tokio::task::JoinError,
    },
    #[error("worker pool is closed")]
    PoolClosed,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("failed to start worker runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl UpdaterError {
    pub(crate) fn task(operation: &'static str, source: tokio::task::JoinError) -> Self {
        Self::Task { operation, source }
    }
}
