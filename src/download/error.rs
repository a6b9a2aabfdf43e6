//! Error types for the download module.
//!
//! One taxonomy covers every way a job can terminate: extraction, transport,
//! filesystem, decryption, cancellation, and remux failures. The engine
//! returns exactly one of these (or success) per job invocation; the queue
//! records the message verbatim and maps [`DownloadError::Cancelled`] to the
//! Cancelled status rather than Failed.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching media.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The extractor collaborator could not resolve the URL to media.
    #[error("extraction failed for {url}: {message}")]
    Extraction {
        /// The URL that failed to resolve.
        url: String,
        /// Description from the extractor.
        message: String,
    },

    /// No registered extractor matched the URL.
    #[error("no extractor matches {url}")]
    NoExtractor {
        /// The unmatched URL.
        url: String,
    },

    /// HTTP error response (any non-2xx status).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Network-level error (DNS resolution, connection reset, TLS errors).
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// File system error during download (create directory/file, write).
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The HLS manifest could not be fetched or parsed.
    #[error("invalid HLS manifest at {url}: {message}")]
    Manifest {
        /// The manifest URL.
        url: String,
        /// Description of the parse or structure problem.
        message: String,
    },

    /// HLS segment decryption failed (bad key, IV, or corrupt data).
    #[error("decryption failed: {message}")]
    Decryption {
        /// Description of the decryption problem.
        message: String,
    },

    /// The job's cancellation signal was observed.
    ///
    /// Distinguished from every other variant: the queue maps this to the
    /// Cancelled terminal status, not Failed.
    #[error("download cancelled")]
    Cancelled,

    /// The remux tool ran but failed.
    ///
    /// Never terminal for a job: callers log it and keep the un-merged files.
    #[error("remux failed: {message}")]
    Merge {
        /// Captured tool output or launch error.
        message: String,
    },

    /// The media descriptor carried no usable entries.
    #[error("no {kind} available")]
    NoMedia {
        /// What was missing ("video formats", "images").
        kind: &'static str,
    },
}

impl DownloadError {
    /// Creates an extraction error.
    pub fn extraction(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a manifest error.
    pub fn manifest(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Manifest {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a decryption error.
    pub fn decryption(message: impl Into<String>) -> Self {
        Self::Decryption {
            message: message.into(),
        }
    }

    /// Creates a merge error.
    pub fn merge(message: impl Into<String>) -> Self {
        Self::Merge {
            message: message.into(),
        }
    }

    /// Returns true if this error is the cancellation signal.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// No `From<reqwest::Error>` or `From<std::io::Error>` impls: the variants
// require context (url, path) the source errors do not carry, so callers go
// through the helper constructors.
