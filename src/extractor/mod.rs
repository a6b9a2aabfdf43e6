//! Extractor contract: turning a URL into a normalized media descriptor.
//!
//! Per-site extraction logic is an external collaborator; this module owns
//! only the contract the engine consumes:
//!
//! - [`MediaDescriptor`] - closed sum type over video/audio/image media
//! - [`Extractor`] - async trait individual extractors implement
//! - [`ExtractorRegistry`] - explicit ordered registry, first match wins
//! - [`DirectMediaExtractor`] - fallback for direct file URLs
//!
//! The registry is built at process construction and injected into the
//! engine, so registration order (and therefore match precedence) is always
//! visible at the construction site.

mod direct;

pub use direct::DirectMediaExtractor;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Error returned when an extractor cannot resolve a URL.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ExtractError {
    message: String,
}

impl ExtractError {
    /// Creates an extraction error with a human-readable description.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One downloadable video rendition.
#[derive(Debug, Clone, Default)]
pub struct VideoFormat {
    /// Fetch URL for the video stream (may be an HLS manifest).
    pub url: String,
    /// Separate audio stream URL when the rendition is video-only.
    pub audio_url: Option<String>,
    /// Per-request headers required by the origin (referer, cookies).
    pub headers: HashMap<String, String>,
    /// Bitrate used for format selection; higher is better.
    pub bitrate: u64,
    /// Container extension as declared by the source (`mp4`, `webm`, `m3u8`).
    pub ext: String,
}

/// Video media with one or more selectable formats.
#[derive(Debug, Clone)]
pub struct VideoMedia {
    /// Human-readable title.
    pub title: String,
    /// Stable source-side identifier, used as a filename fallback.
    pub id: String,
    /// Offered formats, in source order.
    pub formats: Vec<VideoFormat>,
}

/// Audio-only media.
#[derive(Debug, Clone)]
pub struct AudioMedia {
    /// Human-readable title.
    pub title: String,
    /// Stable source-side identifier.
    pub id: String,
    /// Fetch URL.
    pub url: String,
    /// Container extension (`mp3`, `m4a`).
    pub ext: String,
}

/// One image entry within an image post.
#[derive(Debug, Clone)]
pub struct ImageFile {
    /// Fetch URL.
    pub url: String,
    /// File extension (`jpg`, `png`).
    pub ext: String,
}

/// Image media, possibly a multi-image post.
#[derive(Debug, Clone)]
pub struct ImageMedia {
    /// Human-readable title.
    pub title: String,
    /// Stable source-side identifier.
    pub id: String,
    /// Images in post order; downloaded sequentially.
    pub images: Vec<ImageFile>,
}

/// Normalized description of fetchable content.
///
/// The engine matches on this exhaustively in one place; adding a media kind
/// means extending this enum and that single match site.
#[derive(Debug, Clone)]
pub enum MediaDescriptor {
    /// Video with selectable formats.
    Video(VideoMedia),
    /// Audio-only media.
    Audio(AudioMedia),
    /// One or more images.
    Image(ImageMedia),
}

/// An extractor resolves URLs it recognizes into media descriptors.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Short identifier for logging.
    fn name(&self) -> &'static str;

    /// Returns true if this extractor handles the given URL.
    fn matches(&self, url: &str) -> bool;

    /// Resolves the URL to a media descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] when the URL cannot be resolved to media.
    async fn extract(&self, url: &str) -> Result<MediaDescriptor, ExtractError>;
}

/// Ordered extractor registry; the first registered match wins.
#[derive(Default)]
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an extractor; earlier registrations take precedence.
    pub fn register(&mut self, extractor: Box<dyn Extractor>) {
        debug!(name = extractor.name(), "registering extractor");
        self.extractors.push(extractor);
    }

    /// Returns the number of registered extractors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    /// Returns true if no extractors are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    /// Returns the first extractor whose `matches` accepts the URL.
    ///
    /// Deterministic by registration order.
    #[must_use]
    pub fn find(&self, url: &str) -> Option<&dyn Extractor> {
        self.extractors
            .iter()
            .find(|e| e.matches(url))
            .map(AsRef::as_ref)
    }
}
