use futures_util::StreamExt;
use log::{debug, info};
use thiserror::Error;

use crate::first_line;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL {url}: {details}")]
    InvalidUrl { url: String, details: String },
    #[error("failed to request {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with HTTP {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("failed to read response from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Whether the failure happened while talking to the endpoint, as opposed
    /// to the URL itself being malformed.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        !matches!(self, Self::InvalidUrl { .. })
    }
}

pub(crate) fn parse_url(url: &str) -> Result<reqwest::Url, FetchError> {
    reqwest::Url::parse(url).map_err(|error| FetchError::InvalidUrl {
        url: url.to_string(),
        details: error.to_string(),
    })
}

/// GET `url` and return the first line of the response body.
///
/// The body is consumed only up to the first line break; the response is
/// dropped afterwards, which releases the connection.
pub(crate) async fn fetch_first_line(
    client: &reqwest::Client,
    url: &str,
) -> Result<String, FetchError> {
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
        });
    }

    let mut buffer = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;
        buffer.extend_from_slice(&chunk);
        if chunk.contains(&b'\n') {
            break;
        }
    }

    Ok(first_line(&buffer))
}

/// Fetch the single-line version string published at `url`.
///
/// # Errors
/// Returns an error when the URL is malformed, the request fails, the server
/// answers with a non-success status, or the body cannot be read.
pub async fn fetch_latest_version(
    client: &reqwest::Client,
    url: &str,
) -> Result<String, FetchError> {
    info!("Retrieving latest version from {url}");
    let latest = fetch_first_line(client, url).await?;
    debug!("Retrieved latest version {latest:?} from {url}");
    Ok(latest)
}
