//! CLI entry point for the media downloader.

use std::io::{self, IsTerminal, Read};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info, warn};
use url::Url;

use mediagrab_core::config::Config;
use mediagrab_core::download::DownloadEngine;
use mediagrab_core::extractor::{DirectMediaExtractor, ExtractorRegistry};
use mediagrab_core::queue::{JobQueue, JobStatus};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("mediagrab starting");

    // Read input: from positional args or stdin
    let input_text = if args.urls.is_empty() {
        if io::stdin().is_terminal() {
            info!("No input provided. Pipe URLs via stdin or pass as arguments.");
            info!("Example: echo 'https://example.com/clip.mp4' | mediagrab");
            return Ok(());
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        args.urls.join("\n")
    };

    let lines: Vec<&str> = input_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        info!("No URLs found in input");
        return Ok(());
    }

    tokio::fs::create_dir_all(&args.output_dir).await?;

    let config = Config {
        output_dir: args.output_dir.clone(),
        max_concurrent: usize::from(args.concurrency),
        hls_concurrency: usize::from(args.hls_concurrency),
        history_retention: Duration::from_secs(args.retention_secs),
        ffmpeg_path: args.ffmpeg.clone(),
        ..Config::default()
    };

    let mut registry = ExtractorRegistry::new();
    // The direct-link fallback goes last so site extractors registered before
    // it take precedence.
    registry.register(Box::new(DirectMediaExtractor::new()));

    let engine = Arc::new(DownloadEngine::new(config.clone(), registry));
    let queue = JobQueue::new(&config, engine);

    // Enqueue everything; malformed entries become failed history records
    // instead of aborting the batch.
    for line in &lines {
        match Url::parse(line) {
            Ok(_) => {
                queue.add_job((*line).to_string(), None)?;
            }
            Err(e) => {
                warn!(input = %line, error = %e, "skipping malformed URL");
                queue.add_failed_job((*line).to_string(), format!("invalid URL: {e}"));
            }
        }
    }

    // Poll until every job reaches a terminal state.
    loop {
        let jobs = queue.get_all_jobs();
        if jobs.iter().all(|job| job.status.is_terminal()) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    let jobs = queue.get_all_jobs();
    let completed = jobs
        .iter()
        .filter(|j| j.status == JobStatus::Completed)
        .count();
    let failed = jobs.iter().filter(|j| j.status == JobStatus::Failed).count();
    let cancelled = jobs
        .iter()
        .filter(|j| j.status == JobStatus::Cancelled)
        .count();

    for job in jobs.iter().filter(|j| j.status == JobStatus::Failed) {
        warn!(
            url = %job.url,
            error = job.error.as_deref().unwrap_or("unknown"),
            "download failed"
        );
    }

    info!(
        completed,
        failed,
        cancelled,
        total = jobs.len(),
        "Downloads complete"
    );

    queue.shutdown().await;
    Ok(())
}
