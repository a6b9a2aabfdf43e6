//! Fallback extractor for URLs that point directly at a media file.
//!
//! Matches on the URL path extension alone and produces a single-entry
//! descriptor; registered last so site-specific extractors always win.

use async_trait::async_trait;
use url::Url;

use super::{
    AudioMedia, ExtractError, Extractor, ImageFile, ImageMedia, MediaDescriptor, VideoFormat,
    VideoMedia,
};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mkv", "mov", "ts", "m3u8"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "aac", "opus", "flac", "wav", "ogg"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Extractor for direct links to video/audio/image files.
#[derive(Debug, Default)]
pub struct DirectMediaExtractor;

impl DirectMediaExtractor {
    /// Creates the fallback extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Splits a URL path's last segment into (stem, extension), lowercased ext.
fn stem_and_extension(url: &str) -> Option<(String, String)> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    let dot = last.rfind('.')?;
    let stem = &last[..dot];
    let ext = last[dot + 1..].to_lowercase();
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some((stem.to_string(), ext))
}

#[async_trait]
impl Extractor for DirectMediaExtractor {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn matches(&self, url: &str) -> bool {
        stem_and_extension(url).is_some_and(|(_, ext)| {
            VIDEO_EXTENSIONS.contains(&ext.as_str())
                || AUDIO_EXTENSIONS.contains(&ext.as_str())
                || IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
    }

    async fn extract(&self, url: &str) -> Result<MediaDescriptor, ExtractError> {
        let (stem, ext) = stem_and_extension(url)
            .ok_or_else(|| ExtractError::new(format!("no media extension in {url}")))?;

        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            return Ok(MediaDescriptor::Video(VideoMedia {
                title: stem.clone(),
                id: stem,
                formats: vec![VideoFormat {
                    url: url.to_string(),
                    ext,
                    ..VideoFormat::default()
                }],
            }));
        }

        if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            return Ok(MediaDescriptor::Audio(AudioMedia {
                title: stem.clone(),
                id: stem,
                url: url.to_string(),
                ext,
            }));
        }

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            return Ok(MediaDescriptor::Image(ImageMedia {
                title: stem.clone(),
                id: stem,
                images: vec![ImageFile {
                    url: url.to_string(),
                    ext,
                }],
            }));
        }

        Err(ExtractError::new(format!(
            "unsupported media extension .{ext} in {url}"
        )))
    }
}
