//! Job repository implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use vpaper_core::{Error, Job, JobRepository, Result};

/// In-memory implementation of JobRepository.
#[derive(Default)]
pub struct MemJobRepository {
    jobs: RwLock<HashMap<Uuid, Vec<Job>>>,
}

impl MemJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of recorded jobs across all documents.
    pub async fn count(&self) -> usize {
        self.jobs.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl JobRepository for MemJobRepository {
    async fn create(&self, document_id: Uuid, job: &Job) -> Result<()> {
        if job.document_id != document_id {
            return Err(Error::InvalidInput(format!(
                "job {} belongs to document {}, not {}",
                job.id, job.document_id, document_id
            )));
        }
        let mut jobs = self.jobs.write().await;
        jobs.entry(document_id).or_default().push(job.clone());
        debug!(%document_id, job_id = %job.id, status = ?job.status, "Stored job");
        Ok(())
    }

    async fn get_by_document(&self, document_id: Uuid) -> Result<Vec<Job>> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(&document_id).cloned().unwrap_or_default())
    }
}
