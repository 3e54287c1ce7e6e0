//! virtualpaper ingestion daemon.
//!
//! Watches the input directory and ingests every file written into it until
//! interrupted.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vpaper_db::Database;
use vpaper_jobs::{ImageMagickThumbnailer, IngestConfig, IngestContext, IngestEvent, IngestManager};

const DEFAULT_LOG_FILTER: &str = "vpaper=info";
const DEFAULT_LOG_FILE: &str = "vpaper-daemon.log";

/// Logging options.
///
/// - `LOG_FORMAT`: `json` or `text` (default)
/// - `LOG_FILE`: write to a daily rotated file instead of stdout
/// - `LOG_ANSI`: force colors on or off
/// - `RUST_LOG`: filter, default `vpaper=info`
#[derive(Debug, Default, PartialEq, Eq)]
struct LogSettings {
    json: bool,
    file: Option<PathBuf>,
    ansi: Option<bool>,
}

impl LogSettings {
    fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            json: lookup("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            file: lookup("LOG_FILE").filter(|p| !p.is_empty()).map(PathBuf::from),
            ansi: lookup("LOG_ANSI").map(|v| v == "true" || v == "1"),
        }
    }

    /// Files get no colors unless asked for.
    fn ansi(&self) -> Option<bool> {
        self.ansi.or(self.file.as_ref().map(|_| false))
    }
}

/// Install the global subscriber. Keep the guard alive to flush file output.
fn init_tracing(settings: &LogSettings) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (writer, guard) = match &settings.file {
        Some(path) => {
            let dir = path.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path.file_name().unwrap_or(DEFAULT_LOG_FILE.as_ref());
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };

    let mut layer = tracing_subscriber::fmt::layer().with_writer(writer);
    if let Some(ansi) = settings.ansi() {
        layer = layer.with_ansi(ansi);
    }
    let registry = tracing_subscriber::registry().with(filter);
    if settings.json {
        registry.with(layer.json()).init();
    } else {
        registry.with(layer).init();
    }
    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let log = LogSettings::from_env();
    let _log_guard = init_tracing(&log);
    info!(json = log.json, file = ?log.file, "Logging initialized");

    let config = IngestConfig::from_env();
    let thumbnails = match std::env::var("VPAPER_CONVERT_BIN") {
        Ok(program) => ImageMagickThumbnailer::new().with_program(program),
        Err(_) => ImageMagickThumbnailer::new(),
    };

    let db = Database::new();
    let ctx = IngestContext {
        documents: db.document_repository(),
        jobs: db.job_repository(),
        thumbnails: Arc::new(thumbnails),
        previews_dir: config.previews_dir.clone(),
        user_id: config.ingest_user_id,
    };

    let manager = IngestManager::new(config, ctx)?;
    let mut events = manager.events();
    manager.start().await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received interrupt, shutting down");
                break;
            }
            event = events.recv() => match event {
                Ok(IngestEvent::FileProcessed(report)) => {
                    debug!(file = %report.file.display(), outcome = ?report.outcome, "Processed");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Event stream interrupted"),
            },
        }
    }

    manager.stop().await?;
    manager.wait().await;
    info!(documents = db.documents.count().await, "Shutdown complete");
    Ok(())
}
