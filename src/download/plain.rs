//! Plain HTTP downloader: streams one resource to one file.
//!
//! The client is created once and shared across jobs for connection pooling.
//! Requests carry no overall timeout - downloads may be arbitrarily large
//! and slow - and cancellation is observed at chunk granularity instead.

use std::collections::HashMap;
use std::path::Path;

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use super::error::DownloadError;
use super::Progress;

/// User-Agent applied when an extractor supplies no request headers.
///
/// Media CDNs routinely reject tool-identifying agents, so the default is a
/// browser-like string rather than the crate name.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Seconds allowed for connection establishment. Connect problems should
/// surface quickly even though transfers themselves are unbounded.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// HTTP client for streaming media downloads.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a client with no request timeout and gzip decompression.
    ///
    /// # Panics
    ///
    /// Panics if the client builder fails with this static configuration,
    /// which does not happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Issues a GET and validates the response status.
    ///
    /// Caller headers replace the defaults entirely when present; otherwise
    /// only the default User-Agent is sent.
    async fn get_checked(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<reqwest::Response, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let mut request = self.client.get(url);
        if headers.is_empty() {
            request = request.header(USER_AGENT, DEFAULT_USER_AGENT);
        } else {
            let mut map = HeaderMap::new();
            for (name, value) in headers {
                if let (Ok(name), Ok(value)) = (
                    HeaderName::from_bytes(name.as_bytes()),
                    HeaderValue::from_str(value),
                ) {
                    map.insert(name, value);
                } else {
                    debug!(header = %name, "skipping malformed request header");
                }
            }
            request = request.headers(map);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;

        if !response.status().is_success() {
            return Err(DownloadError::http_status(url, response.status().as_u16()));
        }

        Ok(response)
    }

    /// Fetches a small resource (manifest, decryption key, segment) fully
    /// into memory.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Cancelled`] when the token fires mid-fetch,
    /// plus the usual transport and status errors.
    pub async fn fetch_bytes(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        token: &CancellationToken,
    ) -> Result<bytes::Bytes, DownloadError> {
        if token.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }
        let response = self.get_checked(url, headers).await?;
        tokio::select! {
            () = token.cancelled() => Err(DownloadError::Cancelled),
            body = response.bytes() => body.map_err(|e| DownloadError::network(url, e)),
        }
    }

    /// Streams a resource into a newly created file at `dest`.
    ///
    /// The progress callback fires after every chunk with (bytes written so
    /// far, content length or 0 when unknown). The cancellation token is
    /// checked before each chunk read; an in-flight read may complete, but no
    /// new chunk begins after cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::HttpStatus`] on any non-2xx response,
    /// [`DownloadError::Network`] on transport failures,
    /// [`DownloadError::Io`] on filesystem failures, and
    /// [`DownloadError::Cancelled`] when the token fires.
    #[instrument(skip(self, headers, progress, token), fields(url = %url, dest = %dest.display()))]
    pub async fn download_to_path(
        &self,
        url: &str,
        dest: &Path,
        headers: &HashMap<String, String>,
        progress: &Progress<'_>,
        token: &CancellationToken,
    ) -> Result<u64, DownloadError> {
        let response = self.get_checked(url, headers).await?;
        let total = response.content_length().unwrap_or(0);

        let file = File::create(dest)
            .await
            .map_err(|e| DownloadError::io(dest, e))?;
        let mut writer = BufWriter::new(file);
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        loop {
            if token.is_cancelled() {
                return Err(DownloadError::Cancelled);
            }
            let chunk = tokio::select! {
                () = token.cancelled() => return Err(DownloadError::Cancelled),
                chunk = stream.next() => match chunk {
                    Some(chunk) => chunk.map_err(|e| DownloadError::network(url, e))?,
                    None => break,
                },
            };
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| DownloadError::io(dest, e))?;
            written += chunk.len() as u64;
            progress(written, total);
        }

        writer
            .flush()
            .await
            .map_err(|e| DownloadError::io(dest, e))?;

        debug!(bytes = written, "download complete");
        Ok(written)
    }
}
