//! Ingestion configuration.

use std::path::PathBuf;
use std::time::Duration;

use vpaper_core::defaults;
use vpaper_core::{Error, Result, UserId};

/// Configuration for the ingestion manager and its workers.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Directory watched (recursively) for new files.
    pub input_dir: PathBuf,
    /// Directory previews are written to.
    pub previews_dir: PathBuf,
    /// Number of worker tasks.
    pub max_workers: usize,
    /// Capacity of each worker's input queue.
    pub queue_capacity: usize,
    /// Upper bound on one dispatcher wait.
    pub poll_interval_ms: u64,
    /// Pause after each dispatcher iteration.
    pub dispatch_delay_ms: u64,
    /// Owner of ingested documents.
    pub ingest_user_id: UserId,
    /// Seed for the fallback scheduler. `None` seeds from entropy.
    pub scheduler_seed: Option<u64>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(defaults::INGEST_INPUT_DIR),
            previews_dir: PathBuf::from(defaults::INGEST_PREVIEWS_DIR),
            max_workers: defaults::INGEST_MAX_WORKERS,
            queue_capacity: defaults::INGEST_QUEUE_CAPACITY,
            poll_interval_ms: defaults::INGEST_POLL_INTERVAL_MS,
            dispatch_delay_ms: defaults::INGEST_DISPATCH_DELAY_MS,
            ingest_user_id: defaults::INGEST_USER_ID,
            scheduler_seed: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse::<T>().ok())
}

impl IngestConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `VPAPER_INPUT_DIR` | `./input` | Watched directory |
    /// | `VPAPER_PREVIEWS_DIR` | `./previews` | Preview output directory |
    /// | `VPAPER_MAX_WORKERS` | `4` | Worker count |
    /// | `VPAPER_QUEUE_CAPACITY` | `5` | Per-worker queue capacity |
    /// | `VPAPER_POLL_INTERVAL_MS` | `100` | Dispatcher wait bound |
    /// | `VPAPER_DISPATCH_DELAY_MS` | `1000` | Pause between dispatcher iterations |
    /// | `VPAPER_INGEST_USER_ID` | `5` | Owner of ingested documents |
    /// | `VPAPER_SCHEDULER_SEED` | unset | Fixed seed for the fallback scheduler |
    ///
    /// Unparsable numbers fall back to the default.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            input_dir: std::env::var("VPAPER_INPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(base.input_dir),
            previews_dir: std::env::var("VPAPER_PREVIEWS_DIR")
                .map(PathBuf::from)
                .unwrap_or(base.previews_dir),
            max_workers: env_parse("VPAPER_MAX_WORKERS").unwrap_or(base.max_workers),
            queue_capacity: env_parse("VPAPER_QUEUE_CAPACITY").unwrap_or(base.queue_capacity),
            poll_interval_ms: env_parse("VPAPER_POLL_INTERVAL_MS")
                .unwrap_or(base.poll_interval_ms),
            dispatch_delay_ms: env_parse("VPAPER_DISPATCH_DELAY_MS")
                .unwrap_or(base.dispatch_delay_ms),
            ingest_user_id: env_parse("VPAPER_INGEST_USER_ID").unwrap_or(base.ingest_user_id),
            scheduler_seed: env_parse("VPAPER_SCHEDULER_SEED"),
        }
    }

    pub fn with_input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.input_dir = dir.into();
        self
    }

    pub fn with_previews_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.previews_dir = dir.into();
        self
    }

    pub fn with_max_workers(mut self, n: usize) -> Self {
        self.max_workers = n;
        self
    }

    pub fn with_queue_capacity(mut self, n: usize) -> Self {
        self.queue_capacity = n;
        self
    }

    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn with_dispatch_delay(mut self, ms: u64) -> Self {
        self.dispatch_delay_ms = ms;
        self
    }

    pub fn with_ingest_user(mut self, user_id: UserId) -> Self {
        self.ingest_user_id = user_id;
        self
    }

    pub fn with_scheduler_seed(mut self, seed: u64) -> Self {
        self.scheduler_seed = Some(seed);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn dispatch_delay(&self) -> Duration {
        Duration::from_millis(self.dispatch_delay_ms)
    }

    /// Reject settings the manager cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(Error::Config("max_workers must be at least 1".to_string()));
        }
        if self.queue_capacity == 0 {
            return Err(Error::Config("queue_capacity must be at least 1".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be positive".to_string()));
        }
        if self.input_dir.as_os_str().is_empty() {
            return Err(Error::Config("input_dir is empty".to_string()));
        }
        if self.previews_dir.as_os_str().is_empty() {
            return Err(Error::Config("previews_dir is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_defaults_module() {
        let config = IngestConfig::default();
        assert_eq!(config.max_workers, defaults::INGEST_MAX_WORKERS);
        assert_eq!(config.queue_capacity, 5);
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.dispatch_delay(), Duration::from_secs(1));
        assert_eq!(config.ingest_user_id, 5);
        assert!(config.scheduler_seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = IngestConfig::default()
            .with_input_dir("/tmp/in")
            .with_previews_dir("/tmp/prev")
            .with_max_workers(2)
            .with_queue_capacity(1)
            .with_poll_interval(10)
            .with_dispatch_delay(0)
            .with_ingest_user(9)
            .with_scheduler_seed(42);

        assert_eq!(config.input_dir, PathBuf::from("/tmp/in"));
        assert_eq!(config.previews_dir, PathBuf::from("/tmp/prev"));
        assert_eq!(config.max_workers, 2);
        assert_eq!(config.queue_capacity, 1);
        assert_eq!(config.dispatch_delay(), Duration::ZERO);
        assert_eq!(config.ingest_user_id, 9);
        assert_eq!(config.scheduler_seed, Some(42));
    }

    #[test]
    fn test_validate_rejects_empty_pool() {
        let err = IngestConfig::default().with_max_workers(0).validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(IngestConfig::default()
            .with_queue_capacity(0)
            .validate()
            .is_err());
        assert!(IngestConfig::default()
            .with_poll_interval(0)
            .validate()
            .is_err());
    }
}
