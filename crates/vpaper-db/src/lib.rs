//! # vpaper-db
//!
//! In-memory storage layer for virtualpaper.
//!
//! This crate provides reference implementations of the
//! [`DocumentRepository`] and [`JobRepository`] traits. The daemon runs on
//! them when no external store is configured, and the ingestion tests use
//! them to observe what the pipeline persisted.
//!
//! ## Example
//!
//! ```rust
//! use vpaper_db::{Database, Document, DocumentRepository};
//!
//! # async fn demo() -> vpaper_db::Result<()> {
//! let db = Database::new();
//! let doc = Document::ingested(1, "scan.pdf", "deadbeef");
//! db.documents.create(&doc).await?;
//! assert!(db.documents.get_by_hash("deadbeef").await?.is_some());
//! # Ok(())
//! # }
//! ```

pub mod documents;
pub mod jobs;

use std::sync::Arc;

pub use documents::MemDocumentRepository;
pub use jobs::MemJobRepository;

// Re-export core types
pub use vpaper_core::*;

/// Combined storage context with all repositories.
#[derive(Clone, Default)]
pub struct Database {
    /// Document repository.
    pub documents: Arc<MemDocumentRepository>,
    /// Job repository.
    pub jobs: Arc<MemJobRepository>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document repository as a trait object.
    pub fn document_repository(&self) -> Arc<dyn DocumentRepository> {
        self.documents.clone()
    }

    /// Job repository as a trait object.
    pub fn job_repository(&self) -> Arc<dyn JobRepository> {
        self.jobs.clone()
    }
}
