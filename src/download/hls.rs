//! HLS downloader: fetches a media playlist's segments concurrently and
//! reassembles them in manifest order.
//!
//! Concurrency comes from an order-preserving buffered stream: up to
//! `concurrency` segment fetches run at once, but results are consumed in
//! manifest order, so the writer never has to reorder. AES-128 segment
//! encryption (CBC, PKCS7) is handled inline; the key is fetched once per
//! distinct key URI before the pipeline starts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aes::Aes128;
use cipher::{BlockModeDecrypt, KeyIvInit, block_padding::Pkcs7};
use futures_util::{StreamExt, stream};
use m3u8_rs::{KeyMethod, MediaPlaylist, Playlist};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::Progress;
use super::error::DownloadError;
use super::plain::HttpClient;
use super::remux::Remuxer;

type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Decryption parameters for one segment.
#[derive(Debug, Clone)]
struct SegmentCrypto {
    key: [u8; 16],
    iv: [u8; 16],
}

/// One resolved segment fetch.
#[derive(Debug, Clone)]
struct SegmentPlan {
    url: String,
    crypto: Option<SegmentCrypto>,
}

/// Downloader for HLS manifests.
pub struct HlsDownloader {
    client: HttpClient,
    concurrency: usize,
    remuxer: Arc<dyn Remuxer>,
}

impl HlsDownloader {
    /// Creates an HLS downloader fetching up to `concurrency` segments at
    /// once.
    #[must_use]
    pub fn new(client: HttpClient, concurrency: usize, remuxer: Arc<dyn Remuxer>) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
            remuxer,
        }
    }

    /// Downloads the stream behind `manifest_url` into `dest` (a `.ts` path).
    ///
    /// Master playlists are followed one level to their highest-bandwidth
    /// variant. After all segments are written, the file is converted to
    /// `.mp4` when the remux tool is available; conversion failure keeps the
    /// `.ts` file and still counts as success. Returns the final output path.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Manifest`] for unfetchable or malformed
    /// playlists, [`DownloadError::Decryption`] for key/IV problems, plus the
    /// transport, IO, and cancellation errors of the underlying fetches.
    #[instrument(skip(self, headers, progress, token), fields(url = %manifest_url))]
    pub async fn download(
        &self,
        manifest_url: &str,
        dest: &Path,
        headers: &HashMap<String, String>,
        progress: &Progress<'_>,
        token: &CancellationToken,
    ) -> Result<PathBuf, DownloadError> {
        let (playlist, playlist_url) = self.resolve_media_playlist(manifest_url, headers, token).await?;
        let segments = self
            .plan_segments(&playlist, &playlist_url, headers, token)
            .await?;
        if segments.is_empty() {
            return Err(DownloadError::manifest(manifest_url, "playlist has no segments"));
        }

        let total = segments.len() as u64;
        info!(segments = total, "starting HLS download");

        let file = File::create(dest)
            .await
            .map_err(|e| DownloadError::io(dest, e))?;
        let mut writer = BufWriter::new(file);

        let client = &self.client;
        let mut fetches = stream::iter(segments.into_iter())
            .map(|segment| async move {
                let bytes = client.fetch_bytes(&segment.url, headers, token).await?;
                Ok::<_, DownloadError>((segment, bytes))
            })
            .buffered(self.concurrency);

        let mut completed: u64 = 0;
        while let Some(fetched) = fetches.next().await {
            let (segment, bytes) = fetched?;
            let payload = match &segment.crypto {
                Some(crypto) => decrypt_segment(&bytes, &crypto.key, &crypto.iv)?,
                None => bytes.to_vec(),
            };
            writer
                .write_all(&payload)
                .await
                .map_err(|e| DownloadError::io(dest, e))?;
            completed += 1;
            progress(completed, total);
        }
        drop(fetches);

        writer
            .flush()
            .await
            .map_err(|e| DownloadError::io(dest, e))?;

        self.convert_if_possible(dest).await
    }

    /// Fetches and parses the manifest, following a master playlist one level
    /// to its highest-bandwidth variant.
    async fn resolve_media_playlist(
        &self,
        manifest_url: &str,
        headers: &HashMap<String, String>,
        token: &CancellationToken,
    ) -> Result<(MediaPlaylist, Url), DownloadError> {
        let base = Url::parse(manifest_url).map_err(|_| DownloadError::invalid_url(manifest_url))?;
        let bytes = self.client.fetch_bytes(manifest_url, headers, token).await?;

        match m3u8_rs::parse_playlist_res(&bytes) {
            Ok(Playlist::MediaPlaylist(playlist)) => Ok((playlist, base)),
            Ok(Playlist::MasterPlaylist(master)) => {
                let variant = master
                    .variants
                    .iter()
                    .max_by_key(|v| v.bandwidth)
                    .ok_or_else(|| {
                        DownloadError::manifest(manifest_url, "master playlist has no variants")
                    })?;
                let variant_url = base
                    .join(&variant.uri)
                    .map_err(|_| DownloadError::invalid_url(&variant.uri))?;
                debug!(bandwidth = variant.bandwidth, variant = %variant_url, "following master playlist variant");

                let variant_bytes = self
                    .client
                    .fetch_bytes(variant_url.as_str(), headers, token)
                    .await?;
                match m3u8_rs::parse_playlist_res(&variant_bytes) {
                    Ok(Playlist::MediaPlaylist(playlist)) => Ok((playlist, variant_url)),
                    Ok(Playlist::MasterPlaylist(_)) => Err(DownloadError::manifest(
                        variant_url.as_str(),
                        "variant resolved to another master playlist",
                    )),
                    Err(e) => Err(DownloadError::manifest(variant_url.as_str(), e.to_string())),
                }
            }
            Err(e) => Err(DownloadError::manifest(manifest_url, e.to_string())),
        }
    }

    /// Resolves segment URLs and per-segment decryption parameters.
    ///
    /// A `#EXT-X-KEY` tag applies to every following segment until replaced;
    /// each distinct key URI is fetched exactly once.
    async fn plan_segments(
        &self,
        playlist: &MediaPlaylist,
        playlist_url: &Url,
        headers: &HashMap<String, String>,
        token: &CancellationToken,
    ) -> Result<Vec<SegmentPlan>, DownloadError> {
        let mut key_cache: HashMap<String, [u8; 16]> = HashMap::new();
        let mut active_key: Option<(String, Option<String>)> = None;
        let mut plans = Vec::with_capacity(playlist.segments.len());

        for (index, segment) in playlist.segments.iter().enumerate() {
            if let Some(key) = &segment.key {
                match key.method {
                    KeyMethod::None => active_key = None,
                    KeyMethod::AES128 => {
                        let uri = key.uri.as_deref().ok_or_else(|| {
                            DownloadError::decryption("AES-128 key tag without URI")
                        })?;
                        let key_url = playlist_url
                            .join(uri)
                            .map_err(|_| DownloadError::invalid_url(uri))?;
                        active_key = Some((key_url.into(), key.iv.clone()));
                    }
                    ref method => {
                        return Err(DownloadError::manifest(
                            playlist_url.as_str(),
                            format!("unsupported key method {method:?}"),
                        ));
                    }
                }
            }

            let crypto = match &active_key {
                None => None,
                Some((key_url, iv)) => {
                    let key = match key_cache.get(key_url) {
                        Some(key) => *key,
                        None => {
                            let fetched = self.fetch_key(key_url, headers, token).await?;
                            key_cache.insert(key_url.clone(), fetched);
                            fetched
                        }
                    };
                    let iv = match iv {
                        Some(iv_hex) => parse_iv(iv_hex)?,
                        None => derive_iv(playlist.media_sequence + index as u64),
                    };
                    Some(SegmentCrypto { key, iv })
                }
            };

            let segment_url = playlist_url
                .join(&segment.uri)
                .map_err(|_| DownloadError::invalid_url(&segment.uri))?;
            plans.push(SegmentPlan {
                url: segment_url.into(),
                crypto,
            });
        }

        Ok(plans)
    }

    async fn fetch_key(
        &self,
        key_url: &str,
        headers: &HashMap<String, String>,
        token: &CancellationToken,
    ) -> Result<[u8; 16], DownloadError> {
        let bytes = self.client.fetch_bytes(key_url, headers, token).await?;
        <[u8; 16]>::try_from(bytes.as_ref()).map_err(|_| {
            DownloadError::decryption(format!(
                "key at {key_url} is {} bytes, expected 16",
                bytes.len()
            ))
        })
    }

    /// Converts the finished `.ts` into `.mp4` when a remux tool exists.
    ///
    /// Conversion is best-effort: failure keeps the `.ts` file and the
    /// download still succeeds.
    async fn convert_if_possible(&self, dest: &Path) -> Result<PathBuf, DownloadError> {
        if !self.remuxer.available().await {
            debug!("remux tool unavailable, keeping transport stream");
            return Ok(dest.to_path_buf());
        }
        let mp4 = dest.with_extension("mp4");
        match self.remuxer.convert(dest, &mp4).await {
            Ok(()) => {
                if let Err(e) = tokio::fs::remove_file(dest).await {
                    warn!(path = %dest.display(), error = %e, "failed to remove transport stream after conversion");
                }
                info!(output = %mp4.display(), "converted transport stream to mp4");
                Ok(mp4)
            }
            Err(e) => {
                warn!(error = %e, "mp4 conversion failed, keeping transport stream");
                Ok(dest.to_path_buf())
            }
        }
    }
}

/// Parses a `#EXT-X-KEY` IV attribute (hex, optional `0x` prefix).
fn parse_iv(iv_hex: &str) -> Result<[u8; 16], DownloadError> {
    let trimmed = iv_hex
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    let mut iv = [0u8; 16];
    hex::decode_to_slice(trimmed, &mut iv)
        .map_err(|e| DownloadError::decryption(format!("failed to parse IV '{iv_hex}': {e}")))?;
    Ok(iv)
}

/// Derives the implicit IV from a segment's media sequence number
/// (big-endian in the low 8 bytes, per RFC 8216 §5.2).
fn derive_iv(media_sequence: u64) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[8..].copy_from_slice(&media_sequence.to_be_bytes());
    iv
}

/// Decrypts one AES-128-CBC segment with PKCS7 padding.
fn decrypt_segment(data: &[u8], key: &[u8; 16], iv: &[u8; 16]) -> Result<Vec<u8>, DownloadError> {
    let cipher = Aes128CbcDec::new_from_slices(key, iv)
        .map_err(|e| DownloadError::decryption(format!("failed to initialize decryptor: {e}")))?;
    let mut buffer = data.to_vec();
    let plain_len = cipher
        .decrypt_padded::<Pkcs7>(&mut buffer)
        .map_err(|e| DownloadError::decryption(format!("segment decryption failed: {e}")))?
        .len();
    buffer.truncate(plain_len);
    Ok(buffer)
}
