//! Core traits for virtualpaper's external collaborators.
//!
//! Storage and image conversion are provided by other services. These traits
//! define the contracts the ingestion pipeline and rule engine rely on,
//! enabling pluggable backends and testability.

use std::path::Path;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// DOCUMENT REPOSITORY
// =============================================================================

/// Repository for document records.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Look up a document by content hash. A miss is `Ok(None)`.
    async fn get_by_hash(&self, hash: &str) -> Result<Option<Document>>;

    /// Insert a new document and return its id.
    ///
    /// Fails with [`crate::Error::Duplicate`] if a document with the same hash exists.
    async fn create(&self, doc: &Document) -> Result<Uuid>;

    /// Replace a stored document with the given state.
    async fn update(&self, doc: &Document) -> Result<()>;

    /// List a user's documents, newest first, with the total count.
    async fn get_documents(&self, user_id: UserId, paging: Paging) -> Result<(Vec<Document>, i64)>;

    /// Fetch a single document owned by the user.
    async fn get_document(&self, user_id: UserId, id: Uuid) -> Result<Document>;

    /// Check whether the user owns the document.
    async fn user_owns_document(&self, id: Uuid, user_id: UserId) -> Result<bool>;
}

// =============================================================================
// JOB REPOSITORY
// =============================================================================

/// Repository for processing job records.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Persist a job for the document.
    async fn create(&self, document_id: Uuid, job: &Job) -> Result<()>;

    /// All jobs recorded for the document, oldest first.
    async fn get_by_document(&self, document_id: Uuid) -> Result<Vec<Job>>;
}

// =============================================================================
// IMAGE CONVERSION
// =============================================================================

/// Renders a preview image for a source file.
#[async_trait]
pub trait ThumbnailGenerator: Send + Sync {
    /// Render `page` (zero-based) of `source` scaled to `size` pixels high into `output`.
    async fn generate(&self, source: &Path, page: u32, size: u32, output: &Path) -> Result<()>;
}
