//! Media download backend: a bounded-concurrency job queue driving a
//! strategy-dispatching download engine.
//!
//! The crate is structured as three layers:
//!
//! - [`queue`]: job lifecycle, worker pool, cancellation, history retention
//! - [`download`]: plain HTTP, HLS, and dual-stream downloaders behind the
//!   [`download::DownloadEngine`]
//! - [`extractor`]: the contract through which site-specific resolution is
//!   plugged in
//!
//! Embedding applications build an [`extractor::ExtractorRegistry`], wrap it
//! in a [`download::DownloadEngine`], and hand that to a
//! [`queue::JobQueue`]:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mediagrab_core::config::Config;
//! use mediagrab_core::download::DownloadEngine;
//! use mediagrab_core::extractor::{DirectMediaExtractor, ExtractorRegistry};
//! use mediagrab_core::queue::JobQueue;
//!
//! # #[tokio::main] async fn main() {
//! let config = Config::new("/tmp/downloads");
//! let mut registry = ExtractorRegistry::new();
//! registry.register(Box::new(DirectMediaExtractor::new()));
//! let engine = Arc::new(DownloadEngine::new(config.clone(), registry));
//! let queue = JobQueue::new(&config, engine);
//! # let _ = queue;
//! # }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod extractor;
pub mod queue;

pub use config::Config;
pub use download::{DownloadEngine, DownloadError};
pub use extractor::{Extractor, ExtractorRegistry, MediaDescriptor};
pub use queue::{JobQueue, JobSnapshot, JobStatus, QueueError};
