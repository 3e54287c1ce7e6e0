//! Ingestion manager: directory watch, worker pool and dispatch loop.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use vpaper_core::defaults::{EVENT_BUS_CAPACITY, INGEST_REPORT_CAPACITY};
use vpaper_core::{Error, Result};

use crate::config::IngestConfig;
use crate::scheduler::{Assignment, Scheduler};
use crate::watcher::{DirectoryWatcher, FileEventKind};
use crate::worker::{FileTask, IngestContext, TaskOutcome, TaskReport, WorkerHandle};

/// Event emitted by the ingestion manager.
#[derive(Debug, Clone)]
pub enum IngestEvent {
    /// Manager started.
    Started { workers: usize },
    /// Manager was asked to stop.
    Stopped,
    /// A file was queued on a worker.
    FileScheduled {
        path: PathBuf,
        worker_id: usize,
        /// No worker was idle, so the worker was picked at random.
        random: bool,
    },
    /// A worker finished a file.
    FileProcessed(TaskReport),
}

/// Routes files onto the worker pool.
pub struct Dispatcher {
    workers: Vec<WorkerHandle>,
    scheduler: Scheduler,
    events: broadcast::Sender<IngestEvent>,
}

impl Dispatcher {
    pub fn new(
        workers: Vec<WorkerHandle>,
        scheduler: Scheduler,
        events: broadcast::Sender<IngestEvent>,
    ) -> Self {
        Self {
            workers,
            scheduler,
            events,
        }
    }

    /// Queue `path` on the first idle worker, or a random one if all are
    /// busy. Waits while the chosen worker's queue is full.
    pub async fn dispatch(&mut self, path: PathBuf) -> Result<Assignment> {
        let idle: Vec<bool> = self.workers.iter().map(WorkerHandle::is_idle).collect();
        let assignment = self
            .scheduler
            .assign(&idle)
            .ok_or_else(|| Error::Job("no workers to schedule on".to_string()))?;
        let worker = &self.workers[assignment.worker()];

        debug!(file = %path.display(), worker_id = worker.id(), ?assignment, "Scheduling file");
        worker.enqueue(path.clone()).await?;
        let _ = self.events.send(IngestEvent::FileScheduled {
            path,
            worker_id: worker.id(),
            random: matches!(assignment, Assignment::Random(_)),
        });
        Ok(assignment)
    }
}

struct Running {
    stop_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

/// Watches the input directory and feeds new files to a pool of workers.
pub struct IngestManager {
    config: IngestConfig,
    ctx: IngestContext,
    running: AtomicBool,
    inner: Mutex<Option<Running>>,
    events: broadcast::Sender<IngestEvent>,
}

impl IngestManager {
    /// Create a manager. `ctx.previews_dir` and `ctx.user_id` are taken from
    /// `config`.
    pub fn new(config: IngestConfig, mut ctx: IngestContext) -> Result<Self> {
        config.validate()?;
        ctx.previews_dir = config.previews_dir.clone();
        ctx.user_id = config.ingest_user_id;
        let (events, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Ok(Self {
            config,
            ctx,
            running: AtomicBool::new(false),
            inner: Mutex::new(None),
            events,
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Subscribe to manager events.
    pub fn events(&self) -> broadcast::Receiver<IngestEvent> {
        self.events.subscribe()
    }

    /// Register the watch, spawn the workers and the dispatch loop.
    ///
    /// Fails if already running or if the input directory cannot be watched.
    pub async fn start(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::Job("ingest manager is already running".to_string()));
        }

        match self.launch().await {
            Ok(running) => {
                let previous = inner.replace(running);
                if let Some(previous) = previous.filter(|p| !p.tasks.is_empty()) {
                    // started again without wait(); the old tasks finish on their own
                    debug!(tasks = previous.tasks.len(), "Detached tasks of previous run");
                }
                info!(
                    input_dir = %self.config.input_dir.display(),
                    workers = self.config.max_workers,
                    "Ingest manager started"
                );
                let _ = self.events.send(IngestEvent::Started {
                    workers: self.config.max_workers,
                });
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    async fn launch(&self) -> Result<Running> {
        tokio::fs::create_dir_all(&self.config.previews_dir).await?;
        let watcher = DirectoryWatcher::watch(&self.config.input_dir)?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let (report_tx, report_rx) = mpsc::channel(INGEST_REPORT_CAPACITY);

        let mut handles = Vec::with_capacity(self.config.max_workers);
        let mut tasks = Vec::with_capacity(self.config.max_workers + 1);
        for id in 0..self.config.max_workers {
            let (handle, join) = FileTask::new(id, self.ctx.clone())
                .with_reports(report_tx.clone())
                .spawn(self.config.queue_capacity, stop_rx.clone());
            handles.push(handle);
            tasks.push(join);
        }

        let dispatcher = Dispatcher::new(
            handles,
            Scheduler::new(self.config.scheduler_seed),
            self.events.clone(),
        );
        tasks.push(tokio::spawn(dispatch_loop(
            dispatcher,
            watcher,
            report_rx,
            stop_rx,
            self.config.clone(),
            self.events.clone(),
        )));

        Ok(Running { stop_tx, tasks })
    }

    /// Signal the workers and the dispatch loop to stop.
    ///
    /// Files already being processed are finished. Fails if not running.
    pub async fn stop(&self) -> Result<()> {
        let inner = self.inner.lock().await;
        if self
            .running
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::Job("ingest manager is not running".to_string()));
        }

        match inner.as_ref() {
            Some(running) => {
                let _ = running.stop_tx.send(true);
            }
            None => warn!("Ingest manager has no tasks to signal"),
        }
        info!("Ingest manager stopping");
        let _ = self.events.send(IngestEvent::Stopped);
        Ok(())
    }

    /// Wait for the dispatch loop and all workers to exit.
    ///
    /// May be called before [`stop`](Self::stop); it returns once a stop
    /// has been signalled and every task finished. Only the first of
    /// several concurrent callers waits.
    pub async fn wait(&self) {
        // the stop sender stays behind so stop() can still reach the tasks
        let tasks = match self.inner.lock().await.as_mut() {
            Some(running) => std::mem::take(&mut running.tasks),
            None => return,
        };
        if tasks.is_empty() {
            return;
        }
        for task in tasks {
            if let Err(e) = task.await {
                error!(error = ?e, "Ingest task panicked");
            }
        }
        info!("Ingest manager stopped");
    }
}

async fn dispatch_loop(
    mut dispatcher: Dispatcher,
    mut watcher: DirectoryWatcher,
    mut reports: mpsc::Receiver<TaskReport>,
    mut stop: watch::Receiver<bool>,
    config: IngestConfig,
    events: broadcast::Sender<IngestEvent>,
) {
    let mut timer = interval(config.poll_interval());
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let delay = config.dispatch_delay();

    loop {
        tokio::select! {
            _ = stop.changed() => break,
            _ = timer.tick() => {}
            Some(event) = watcher.recv() => {
                if event.kind == FileEventKind::Write {
                    if let Err(e) = dispatcher.dispatch(event.path).await {
                        error!(error = %e, "Failed to schedule file");
                    }
                }
            }
            Some(report) = reports.recv() => {
                log_report(&report);
                let _ = events.send(IngestEvent::FileProcessed(report));
            }
        }

        if !delay.is_zero() {
            tokio::select! {
                _ = stop.changed() => break,
                _ = sleep(delay) => {}
            }
        }
    }
    // dropping the watcher releases the OS watch
    drop(watcher);
    debug!("Dispatch loop exited");
}

fn log_report(report: &TaskReport) {
    match &report.outcome {
        TaskOutcome::Created(document_id) => info!(
            worker_id = report.worker_id,
            file = %report.file.display(),
            %document_id,
            duration_ms = report.duration_ms,
            "File ingested"
        ),
        TaskOutcome::Duplicate => debug!(
            worker_id = report.worker_id,
            file = %report.file.display(),
            "Duplicate file discarded"
        ),
        TaskOutcome::Failed(error) => warn!(
            worker_id = report.worker_id,
            file = %report.file.display(),
            %error,
            duration_ms = report.duration_ms,
            "File ingestion failed"
        ),
    }
}
