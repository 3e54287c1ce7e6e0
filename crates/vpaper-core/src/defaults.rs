//! Centralized default constants for virtualpaper.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers.

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for document listings.
pub const PAGE_LIMIT: i64 = 50;

/// Default page offset.
pub const PAGE_OFFSET: i64 = 0;

// =============================================================================
// INGESTION
// =============================================================================

/// Default number of file processing workers.
pub const INGEST_MAX_WORKERS: usize = 4;

/// Capacity of each worker's input queue. A full queue blocks the dispatcher.
pub const INGEST_QUEUE_CAPACITY: usize = 5;

/// Capacity of the worker → dispatcher report channel.
pub const INGEST_REPORT_CAPACITY: usize = 10;

/// Upper bound on a single dispatcher wait in milliseconds.
pub const INGEST_POLL_INTERVAL_MS: u64 = 100;

/// Pause between dispatcher iterations in milliseconds.
pub const INGEST_DISPATCH_DELAY_MS: u64 = 1000;

/// Owner assigned to documents created from the watched directory.
pub const INGEST_USER_ID: i64 = 5;

/// Default watched input directory.
pub const INGEST_INPUT_DIR: &str = "./input";

/// Default directory for generated previews.
pub const INGEST_PREVIEWS_DIR: &str = "./previews";

/// Filesystem events buffered between the watch thread and the dispatcher.
/// When full the watch thread waits, leaving further events in the OS queue.
pub const WATCH_EVENT_CAPACITY: usize = 256;

/// Default event broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// THUMBNAILS
// =============================================================================

/// Thumbnail height in pixels.
pub const THUMBNAIL_SIZE: u32 = 500;

/// Page rendered into the thumbnail (zero-based).
pub const THUMBNAIL_PAGE: u32 = 0;

/// File extension of generated previews.
pub const THUMBNAIL_EXTENSION: &str = "png";

/// Per-command timeout for the image conversion tool (seconds).
pub const THUMBNAIL_CMD_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// RULES
// =============================================================================

/// Maximum number of regex matches echoed into a rule test trace.
pub const RULE_TRACE_MAX_MATCHES: usize = 10;
