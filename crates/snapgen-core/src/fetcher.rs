//! Renderer fetch
//!
//! Streams a rendered snapshot straight to its destination file. The body is
//! written whatever the response status; a failed transfer removes the
//! partial file.

use crate::config::SnapgenConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Summary of a completed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchReport {
    /// HTTP status of the renderer response
    pub status: u16,
    /// Bytes written to the destination
    pub bytes: u64,
}

/// Fetches rendered snapshots
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    /// GET `url` and write the body to `dest`
    ///
    /// On error `dest` does not exist afterwards (best effort).
    async fn fetch_to(&self, url: &str, dest: &Path) -> Result<FetchReport, FetchError>;
}

/// Build the shared outbound HTTP client
///
/// # Errors
/// Fails if the TLS backend cannot be initialized.
pub fn http_client(config: &SnapgenConfig) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
    if let Some(timeout) = config.request_timeout() {
        builder = builder.timeout(timeout);
    }
    builder.build()
}

/// `reqwest`-backed fetcher
#[derive(Debug, Clone)]
pub struct HttpSnapshotFetcher {
    client: reqwest::Client,
}

impl HttpSnapshotFetcher {
    /// Create fetcher with an existing client
    #[inline]
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<FetchReport, FetchError> {
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| FetchError::io_error(dest, e))?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%url, %status, "renderer answered with an error status; writing body anyway");
        }

        let mut body = response.bytes_stream();
        let mut bytes = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| FetchError::io_error(dest, e))?;
            bytes += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| FetchError::io_error(dest, e))?;

        Ok(FetchReport {
            status: status.as_u16(),
            bytes,
        })
    }
}

#[async_trait]
impl SnapshotFetcher for HttpSnapshotFetcher {
    async fn fetch_to(&self, url: &str, dest: &Path) -> Result<FetchReport, FetchError> {
        let result = self.download(url, dest).await;
        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(dest).await {
                tracing::debug!(path = %dest.display(), error = %e, "partial snapshot not removed");
            }
        }
        result
    }
}
