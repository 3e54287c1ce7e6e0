//! # vpaper-jobs
//!
//! File ingestion for virtualpaper.
//!
//! This crate provides:
//! - A recursive directory watch built on `notify`
//! - A fixed pool of workers, each with a bounded queue
//! - First-idle scheduling with a seedable random fallback
//! - The per-file pipeline: hash, dedupe, create document, render preview
//! - An ImageMagick thumbnail adapter
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vpaper_db::Database;
//! use vpaper_jobs::{ImageMagickThumbnailer, IngestConfig, IngestContext, IngestManager};
//!
//! let config = IngestConfig::from_env();
//! let db = Database::new();
//! let ctx = IngestContext {
//!     documents: db.document_repository(),
//!     jobs: db.job_repository(),
//!     thumbnails: Arc::new(ImageMagickThumbnailer::new()),
//!     previews_dir: config.previews_dir.clone(),
//!     user_id: config.ingest_user_id,
//! };
//!
//! let manager = IngestManager::new(config, ctx)?;
//! manager.start().await?;
//!
//! // Listen for events
//! let mut events = manager.events();
//! while let Ok(event) = events.recv().await {
//!     println!("Event: {:?}", event);
//! }
//!
//! manager.stop().await?;
//! manager.wait().await;
//! ```

pub mod adapters;
pub mod config;
pub mod manager;
pub mod scheduler;
pub mod watcher;
pub mod worker;

// Re-export core types
pub use vpaper_core::*;

pub use adapters::ImageMagickThumbnailer;
pub use config::IngestConfig;
pub use manager::{Dispatcher, IngestEvent, IngestManager};
pub use scheduler::{Assignment, Scheduler};
pub use watcher::{DirectoryWatcher, FileEvent, FileEventKind};
pub use worker::{
    hash_file, FileTask, IngestContext, TaskOutcome, TaskReport, WorkerHandle, WorkerState,
};
