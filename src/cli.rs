//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use mediagrab_core::config::{DEFAULT_HLS_CONCURRENCY, DEFAULT_MAX_CONCURRENT};

/// Batch media downloader.
///
/// Accepts media page or file URLs as arguments (or on stdin, one per line),
/// resolves them through the extractor registry, and downloads everything
/// through a bounded worker pool.
#[derive(Parser, Debug)]
#[command(name = "mediagrab")]
#[command(author, version, about)]
pub struct Args {
    /// URLs to download (reads stdin when omitted)
    pub urls: Vec<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output directory for downloaded files
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Maximum concurrent downloads (1-100)
    #[arg(short = 'c', long, default_value_t = DEFAULT_MAX_CONCURRENT as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    /// Concurrent segment fetches within one HLS download (1-32)
    #[arg(long, default_value_t = DEFAULT_HLS_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=32))]
    pub hls_concurrency: u8,

    /// Seconds finished jobs stay in history before eviction
    #[arg(long, default_value_t = 3600)]
    pub retention_secs: u64,

    /// Name or path of the ffmpeg binary used for merging/remuxing
    #[arg(long, default_value = "ffmpeg")]
    pub ffmpeg: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["mediagrab"]).unwrap();
        assert!(args.urls.is_empty());
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert_eq!(args.concurrency, 3); // DEFAULT_MAX_CONCURRENT
        assert_eq!(args.hls_concurrency, 4); // DEFAULT_HLS_CONCURRENCY
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert_eq!(args.ffmpeg, "ffmpeg");
    }

    #[test]
    fn test_cli_positional_urls() {
        let args = Args::try_parse_from([
            "mediagrab",
            "https://example.com/a.mp4",
            "https://example.com/b.m3u8",
        ])
        .unwrap();
        assert_eq!(args.urls.len(), 2);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["mediagrab", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_concurrency_range_enforced() {
        let result = Args::try_parse_from(["mediagrab", "-c", "0"]);
        assert!(result.is_err());
        let result = Args::try_parse_from(["mediagrab", "-c", "101"]);
        assert!(result.is_err());
    }
}
