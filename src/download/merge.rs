//! Dual-stream download: separate video and audio fetched in parallel, then
//! merged into one container when a remux tool exists.
//!
//! Sources that split streams (DASH-style CDNs) hand the engine a video URL
//! plus an `audio_url`. Both are plain downloads; a shared accumulator folds
//! their progress into one combined figure, reported only once both content
//! lengths are known so the percentage never jumps backwards.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::Progress;
use super::error::DownloadError;
use super::plain::HttpClient;
use super::remux::Remuxer;

/// Picks the audio sibling path for a video output path.
///
/// The container follows the video: `webm` video pairs with `opus` audio,
/// everything else gets `m4a`.
#[must_use]
pub fn audio_sibling_path(video: &Path) -> PathBuf {
    let ext = if video
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("webm"))
    {
        "opus"
    } else {
        "m4a"
    };
    video.with_extension(ext)
}

/// Per-stream (downloaded, total) counters behind one lock.
#[derive(Debug, Default, Clone, Copy)]
struct StreamTotals {
    video: (u64, u64),
    audio: (u64, u64),
}

/// Downloader for video formats carrying a separate audio stream.
pub struct DualStreamDownloader {
    client: HttpClient,
    remuxer: Arc<dyn Remuxer>,
}

impl DualStreamDownloader {
    /// Creates a dual-stream downloader.
    #[must_use]
    pub fn new(client: HttpClient, remuxer: Arc<dyn Remuxer>) -> Self {
        Self { client, remuxer }
    }

    /// Downloads both streams concurrently and merges them when possible.
    ///
    /// The audio lands next to the video (see [`audio_sibling_path`]). Either
    /// stream failing fails the whole download; a partial sibling may remain
    /// on disk. Merging is best-effort: on success the merged file's path is
    /// returned with both originals kept, on failure (or without a remux
    /// tool) the video path is returned and the job still succeeds.
    ///
    /// # Errors
    ///
    /// Propagates the first stream error: transport, status, IO, or
    /// cancellation.
    #[instrument(skip(self, headers, progress, token), fields(video = %video_url, dest = %video_dest.display()))]
    pub async fn download(
        &self,
        video_url: &str,
        audio_url: &str,
        video_dest: &Path,
        headers: &HashMap<String, String>,
        progress: &Progress<'_>,
        token: &CancellationToken,
    ) -> Result<PathBuf, DownloadError> {
        let audio_dest = audio_sibling_path(video_dest);
        let totals = Mutex::new(StreamTotals::default());

        let report = |totals: &Mutex<StreamTotals>| {
            let Ok(snapshot) = totals.lock().map(|guard| *guard) else {
                return;
            };
            // Combined progress waits for both content lengths so the
            // denominator never grows mid-download.
            if snapshot.video.1 > 0 && snapshot.audio.1 > 0 {
                progress(
                    snapshot.video.0 + snapshot.audio.0,
                    snapshot.video.1 + snapshot.audio.1,
                );
            }
        };

        let video_progress = |done: u64, total: u64| {
            if let Ok(mut guard) = totals.lock() {
                guard.video = (done, total);
            }
            report(&totals);
        };
        let audio_progress = |done: u64, total: u64| {
            if let Ok(mut guard) = totals.lock() {
                guard.audio = (done, total);
            }
            report(&totals);
        };

        tokio::try_join!(
            self.client
                .download_to_path(video_url, video_dest, headers, &video_progress, token),
            self.client
                .download_to_path(audio_url, &audio_dest, headers, &audio_progress, token),
        )?;

        if self.remuxer.available().await {
            match self.remuxer.merge(video_dest, &audio_dest).await {
                Ok(merged) => {
                    info!(output = %merged.display(), "merged video and audio streams");
                    return Ok(merged);
                }
                Err(e) => {
                    warn!(error = %e, "stream merge failed, keeping separate files");
                }
            }
        } else {
            debug!("remux tool unavailable, keeping separate streams");
        }

        Ok(video_dest.to_path_buf())
    }
}
