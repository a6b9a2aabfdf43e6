//! Runtime configuration for the download backend.
//!
//! No configuration-file format is defined here; the binary maps CLI flags
//! onto [`Config`], and embedding applications construct it directly.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default number of concurrent download workers.
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

/// Default bound on concurrent segment fetches inside one HLS job.
///
/// This is a nested budget, distinct from the worker-pool bound: one HLS job
/// occupies one worker but may hold up to this many segment fetches in flight.
pub const DEFAULT_HLS_CONCURRENCY: usize = 4;

/// Default retention window for terminal jobs before the background sweep
/// removes them.
pub const DEFAULT_HISTORY_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Default interval between retention sweep passes.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Runtime configuration shared by the job queue and the download engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory under which every output path is rooted.
    pub output_dir: PathBuf,
    /// Size of the worker pool (maximum jobs downloading at once).
    pub max_concurrent: usize,
    /// Terminal jobs older than this are removed by the background sweep.
    pub history_retention: Duration,
    /// How often the retention sweep runs.
    pub sweep_interval: Duration,
    /// Bound on concurrent segment fetches within one HLS job.
    pub hls_concurrency: usize,
    /// Name or path of the external remux tool binary.
    pub ffmpeg_path: String,
}

impl Config {
    /// Creates a configuration with defaults for everything but the output
    /// directory.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Clamps out-of-range values to safe minimums.
    ///
    /// A zero worker pool or segment budget would deadlock the queue, so both
    /// are raised to 1 rather than rejected.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.max_concurrent = self.max_concurrent.max(1);
        self.hls_concurrency = self.hls_concurrency.max(1);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            history_retention: DEFAULT_HISTORY_RETENTION,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            hls_concurrency: DEFAULT_HLS_CONCURRENCY,
            ffmpeg_path: "ffmpeg".to_string(),
        }
    }
}
