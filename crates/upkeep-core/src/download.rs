use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use log::{debug, info};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::remote::{FetchError, parse_url};

/// Progress is reported after every slice of this many bytes.
pub const DOWNLOAD_CHUNK_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub transferred: u64,
    /// Declared `Content-Length`, if the server sent one.
    pub total: Option<u64>,
}

impl DownloadProgress {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(0) | None => None,
            Some(total) => Some(self.transferred as f64 / total as f64),
        }
    }
}

/// Receives download progress inline with the copy loop.
pub trait ProgressListener: Send + Sync {
    fn on_progress(&self, progress: DownloadProgress);
}

impl<F> ProgressListener for F
where
    F: Fn(DownloadProgress) + Send + Sync,
{
    fn on_progress(&self, progress: DownloadProgress) {
        self(progress);
    }
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("download stream from {url} failed: {source}")]
    Stream {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{context} {path}: {source}")]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    fn io(context: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Stream the body of `url` into `dest`, replacing any existing file.
///
/// Missing parent directories are created. A failed transfer leaves the
/// partially written file in place.
///
/// # Errors
/// Returns an error when the request fails, the server answers with a
/// non-success status, or the destination cannot be created or written.
pub async fn download_with_progress(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    listener: Option<&dyn ProgressListener>,
) -> Result<u64, DownloadError> {
    let parsed = parse_url(url)?;

    let response = client
        .get(parsed)
        .send()
        .await
        .map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: response.status(),
        }
        .into());
    }

    let total = response.content_length();

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| DownloadError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|error| DownloadError::io("failed to create", dest, error))?;

    let mut transferred: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| DownloadError::Stream {
            url: url.to_string(),
            source,
        })?;

        for slice in chunk.chunks(DOWNLOAD_CHUNK_SIZE) {
            file.write_all(slice)
                .await
                .map_err(|error| DownloadError::io("failed to write", dest, error))?;
            transferred += slice.len() as u64;
            if let Some(listener) = listener {
                listener.on_progress(DownloadProgress { transferred, total });
            }
        }
    }

    file.flush()
        .await
        .map_err(|error| DownloadError::io("failed to flush", dest, error))?;

    info!(
        "Copied {transferred} bytes from {url} to {}",
        dest.display()
    );
    if let Some(total) = total.filter(|&total| total != transferred) {
        debug!("Declared length {total} differs from {transferred} bytes received");
    }
    Ok(transferred)
}
