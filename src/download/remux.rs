//! Post-download remuxing via an external ffmpeg binary.
//!
//! ffmpeg is an optional system dependency. Everything that needs it goes
//! through the [`Remuxer`] trait so tests can substitute a stub, and callers
//! treat remux failures as non-fatal: the downloaded streams are kept as-is.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::error::DownloadError;

/// Maximum tool output carried into an error message.
const STDERR_TAIL_BYTES: usize = 512;

/// Computes where a merged video+audio container lands.
///
/// The merged file sits next to the video with an `.mp4` extension; when the
/// video itself is already `.mp4` the merged file gets a `_merged` suffix so
/// the original is never overwritten.
#[must_use]
pub fn merged_output_path(video: &Path) -> PathBuf {
    let is_mp4 = video
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mp4"));
    if is_mp4 {
        let stem = video
            .file_stem()
            .map_or_else(|| "merged".to_string(), |s| s.to_string_lossy().into_owned());
        video.with_file_name(format!("{stem}_merged.mp4"))
    } else {
        video.with_extension("mp4")
    }
}

/// Stream-copy remuxing operations.
#[async_trait]
pub trait Remuxer: Send + Sync {
    /// Returns true if the remux tool can be invoked.
    async fn available(&self) -> bool;

    /// Merges a video stream and an audio stream into one container.
    ///
    /// Returns the merged file's path (see [`merged_output_path`]); both
    /// input files are kept.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Merge`] when the tool cannot be launched or
    /// exits non-zero.
    async fn merge(&self, video: &Path, audio: &Path) -> Result<PathBuf, DownloadError>;

    /// Rewraps a single stream into a different container without re-encoding.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Merge`] when the tool cannot be launched or
    /// exits non-zero.
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), DownloadError>;
}

/// [`Remuxer`] backed by an ffmpeg executable on the host.
pub struct FfmpegRemuxer {
    ffmpeg_path: String,
    probe: OnceCell<bool>,
}

impl FfmpegRemuxer {
    /// Creates a remuxer invoking the given ffmpeg binary (name or path).
    #[must_use]
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            probe: OnceCell::new(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<(), DownloadError> {
        debug!(ffmpeg = %self.ffmpeg_path, ?args, "invoking ffmpeg");
        let output = Command::new(&self.ffmpeg_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| DownloadError::merge(format!("failed to launch ffmpeg: {e}")))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail_start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
        // Slicing on a char boundary; from_utf8_lossy output stays valid UTF-8
        // because we only move the start forward to the next boundary.
        let mut start = tail_start;
        while !stderr.is_char_boundary(start) {
            start += 1;
        }
        Err(DownloadError::merge(format!(
            "ffmpeg exited with {}: {}",
            output.status,
            stderr[start..].trim()
        )))
    }
}

#[async_trait]
impl Remuxer for FfmpegRemuxer {
    /// Probes `ffmpeg -version` once and caches the result for the process
    /// lifetime.
    async fn available(&self) -> bool {
        *self
            .probe
            .get_or_init(|| async {
                let available = Command::new(&self.ffmpeg_path)
                    .arg("-version")
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .await
                    .map(|status| status.success())
                    .unwrap_or(false);
                if !available {
                    warn!(ffmpeg = %self.ffmpeg_path, "ffmpeg not available, merge and conversion disabled");
                }
                available
            })
            .await
    }

    async fn merge(&self, video: &Path, audio: &Path) -> Result<PathBuf, DownloadError> {
        let merged = merged_output_path(video);
        let video_arg = video.to_string_lossy();
        let audio_arg = audio.to_string_lossy();
        let merged_arg = merged.to_string_lossy().into_owned();
        self.run(&[
            "-y", "-i", &video_arg, "-i", &audio_arg, "-c", "copy", &merged_arg,
        ])
        .await?;
        Ok(merged)
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<(), DownloadError> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.run(&["-y", "-i", &input, "-c", "copy", &output]).await
    }
}
