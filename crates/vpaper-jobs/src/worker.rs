//! File ingestion worker.
//!
//! Each worker owns a bounded queue of paths and processes them one at a
//! time:
//!
//! 1. open the file read-only
//! 2. hash its content (SHA-256, streamed)
//! 3. skip it if a document with that hash exists
//! 4. create the document record
//! 5. render a preview, recorded as a job
//!
//! Failures abort only the file at hand. The dispatcher sees the worker's
//! [`WorkerState`] and nothing else.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use vpaper_core::defaults::{THUMBNAIL_EXTENSION, THUMBNAIL_PAGE, THUMBNAIL_SIZE};
use vpaper_core::{
    Document, DocumentRepository, Error, Job, JobRepository, Result, ThumbnailGenerator, UserId,
};

const HASH_BUF_SIZE: usize = 64 * 1024;

/// Collaborators shared by all workers.
#[derive(Clone)]
pub struct IngestContext {
    pub documents: Arc<dyn DocumentRepository>,
    pub jobs: Arc<dyn JobRepository>,
    pub thumbnails: Arc<dyn ThumbnailGenerator>,
    pub previews_dir: PathBuf,
    pub user_id: UserId,
}

/// Whether a worker is processing a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Idle = 0,
    Busy = 1,
}

impl WorkerState {
    fn load(cell: &AtomicU8) -> Self {
        match cell.load(Ordering::Acquire) {
            0 => WorkerState::Idle,
            _ => WorkerState::Busy,
        }
    }
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Created(Uuid),
    /// Content already ingested.
    Duplicate,
    Failed(String),
}

/// Sent from a worker to the dispatcher after each file.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub worker_id: usize,
    pub file: PathBuf,
    pub outcome: TaskOutcome,
    pub duration_ms: u64,
}

/// Dispatcher-side handle on a worker.
#[derive(Clone)]
pub struct WorkerHandle {
    id: usize,
    state: Arc<AtomicU8>,
    queue: mpsc::Sender<PathBuf>,
}

impl WorkerHandle {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::load(&self.state)
    }

    pub fn is_idle(&self) -> bool {
        self.state() == WorkerState::Idle
    }

    /// Queue a file, waiting for capacity when the queue is full.
    pub async fn enqueue(&self, path: PathBuf) -> Result<()> {
        self.queue
            .send(path)
            .await
            .map_err(|e| Error::Job(format!("worker {} is gone, dropped {}", self.id, e.0.display())))
    }
}

/// A worker task processing files from its queue.
pub struct FileTask {
    id: usize,
    state: Arc<AtomicU8>,
    ctx: IngestContext,
    reports: Option<mpsc::Sender<TaskReport>>,
}

impl FileTask {
    pub fn new(id: usize, ctx: IngestContext) -> Self {
        Self {
            id,
            state: Arc::new(AtomicU8::new(WorkerState::Idle as u8)),
            ctx,
            reports: None,
        }
    }

    /// Send a [`TaskReport`] for every processed file.
    pub fn with_reports(mut self, reports: mpsc::Sender<TaskReport>) -> Self {
        self.reports = Some(reports);
        self
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::load(&self.state)
    }

    /// Spawn the worker loop. It exits when `stop` flips or the handle's
    /// queue is closed. A file in progress is always finished.
    pub fn spawn(
        self,
        queue_capacity: usize,
        stop: watch::Receiver<bool>,
    ) -> (WorkerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(queue_capacity);
        let handle = WorkerHandle {
            id: self.id,
            state: self.state.clone(),
            queue: tx,
        };
        let join = tokio::spawn(self.run(rx, stop));
        (handle, join)
    }

    async fn run(self, mut queue: mpsc::Receiver<PathBuf>, mut stop: watch::Receiver<bool>) {
        debug!(worker_id = self.id, "Worker started");
        loop {
            tokio::select! {
                biased;
                _ = stop.changed() => break,
                next = queue.recv() => match next {
                    Some(path) => self.handle(path).await,
                    None => break,
                },
            }
        }
        debug!(worker_id = self.id, "Worker stopped");
    }

    async fn handle(&self, path: PathBuf) {
        let start = Instant::now();
        let outcome = self.process(&path).await;
        let report = TaskReport {
            worker_id: self.id,
            file: path,
            outcome,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        if let Some(reports) = &self.reports {
            // never block on a slow dispatcher, it may be blocked on our queue
            if let Err(e) = reports.try_send(report) {
                debug!(worker_id = self.id, error = %e, "Dropped task report");
            }
        }
    }

    /// Run the ingestion pipeline for one file.
    ///
    /// The worker is `Busy` for the duration and `Idle` afterwards, whatever
    /// the outcome.
    #[instrument(skip(self, path), fields(worker_id = self.id, file = %path.display()))]
    pub async fn process(&self, path: &Path) -> TaskOutcome {
        self.state.store(WorkerState::Busy as u8, Ordering::Release);
        let outcome = match self.ingest(path).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Failed to ingest file");
                TaskOutcome::Failed(e.to_string())
            }
        };
        self.state.store(WorkerState::Idle as u8, Ordering::Release);
        outcome
    }

    async fn ingest(&self, path: &Path) -> Result<TaskOutcome> {
        let file = File::open(path).await?;
        let hash = hash_file(file).await?;

        if let Some(existing) = self.ctx.documents.get_by_hash(&hash).await? {
            debug!(%hash, document_id = %existing.id, "Duplicate content, skipping");
            return Ok(TaskOutcome::Duplicate);
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::InvalidInput(format!("no file name in {}", path.display())))?;
        let mut doc = Document::ingested(self.ctx.user_id, filename, hash);

        match self.ctx.documents.create(&doc).await {
            Ok(_) => {}
            Err(Error::Duplicate(msg)) => {
                debug!(%msg, "Document created concurrently, skipping");
                return Ok(TaskOutcome::Duplicate);
            }
            Err(e) => return Err(e),
        }
        info!(document_id = %doc.id, hash = %doc.hash, "Created document");

        self.generate_thumbnail(path, &mut doc).await;
        Ok(TaskOutcome::Created(doc.id))
    }

    /// Render the preview and record the attempt as a job.
    ///
    /// Never fails the pipeline: the document stays even if rendering does.
    async fn generate_thumbnail(&self, source: &Path, doc: &mut Document) {
        let mut job = Job::start(
            doc.id,
            format!("Generate thumbnail ({}x{})", THUMBNAIL_SIZE, THUMBNAIL_SIZE),
        );

        match self.render_preview(source, doc).await {
            Ok(()) => {
                job.finish();
                debug!(document_id = %doc.id, preview = %doc.preview, "Generated thumbnail");
            }
            Err(e) => {
                warn!(document_id = %doc.id, error = %e, "Thumbnail generation failed");
                job.fail(&e.to_string());
            }
        }
        job.stop();

        if let Err(e) = self.ctx.jobs.create(doc.id, &job).await {
            error!(document_id = %doc.id, job_id = %job.id, error = %e, "Failed to record job");
        }
    }

    async fn render_preview(&self, source: &Path, doc: &mut Document) -> Result<()> {
        tokio::fs::create_dir_all(&self.ctx.previews_dir).await?;
        // removed on drop unless persisted
        let tmp = tempfile::Builder::new()
            .prefix(".preview-")
            .suffix(&format!(".{}", THUMBNAIL_EXTENSION))
            .tempfile_in(&self.ctx.previews_dir)?;

        self.ctx
            .thumbnails
            .generate(source, THUMBNAIL_PAGE, THUMBNAIL_SIZE, tmp.path())
            .await?;

        let name = format!("{}.{}", doc.hash, THUMBNAIL_EXTENSION);
        let target = self.ctx.previews_dir.join(&name);
        tmp.persist(&target)
            .map_err(|e| Error::Thumbnail(format!("save preview {}: {}", name, e.error)))?;

        let previous = std::mem::replace(&mut doc.preview, name);
        doc.touch();
        if let Err(e) = self.ctx.documents.update(doc).await {
            doc.preview = previous;
            if let Err(rm) = tokio::fs::remove_file(&target).await {
                warn!(preview = %target.display(), error = %rm, "Failed to remove orphaned preview");
            }
            return Err(e);
        }
        Ok(())
    }
}

/// SHA-256 of everything readable from `file`, as lowercase hex.
pub async fn hash_file(mut file: File) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_BUF_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_file_matches_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        tokio::fs::write(&path, b"abc").await.unwrap();

        let hash = hash_file(File::open(&path).await.unwrap()).await.unwrap();
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_hash_file_spans_buffers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let data = vec![7u8; HASH_BUF_SIZE * 2 + 17];
        tokio::fs::write(&path, &data).await.unwrap();

        let hash = hash_file(File::open(&path).await.unwrap()).await.unwrap();
        assert_eq!(hash, hex::encode(Sha256::digest(&data)));
    }

    #[test]
    fn test_worker_state_load() {
        let cell = AtomicU8::new(WorkerState::Busy as u8);
        assert_eq!(WorkerState::load(&cell), WorkerState::Busy);
        cell.store(WorkerState::Idle as u8, Ordering::Release);
        assert_eq!(WorkerState::load(&cell), WorkerState::Idle);
    }
}
