//! Download strategies and the engine that dispatches between them.
//!
//! - [`plain`]: single-resource HTTP streaming
//! - [`hls`]: segmented HLS with AES-128 decryption and ordered reassembly
//! - [`merge`]: parallel video+audio with post-download remux
//! - [`engine`]: extractor resolution, naming, and strategy dispatch

pub mod engine;
pub mod error;
pub mod filename;
pub mod hls;
pub mod merge;
pub mod plain;
pub mod remux;

pub use engine::DownloadEngine;
pub use error::DownloadError;
pub use hls::HlsDownloader;
pub use merge::DualStreamDownloader;
pub use plain::{DEFAULT_USER_AGENT, HttpClient};
pub use remux::{FfmpegRemuxer, Remuxer};

/// Progress callback: (completed units, total units), total 0 when unknown.
///
/// Units are bytes for plain and dual-stream downloads, segments for HLS,
/// and files for image posts.
pub type Progress<'a> = dyn Fn(u64, u64) + Send + Sync + 'a;
