//! Core data models for virtualpaper.

pub mod rule;

pub use rule::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;

/// Owning user reference.
pub type UserId = i64;

// =============================================================================
// DOCUMENT TYPES
// =============================================================================

/// A single metadata assignment on a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metadata {
    pub key_id: i64,
    pub value_id: i64,
}

impl Metadata {
    pub fn new(key_id: i64, value_id: i64) -> Self {
        Self { key_id, value_id }
    }
}

/// Ordered set of metadata pairs.
///
/// Insertion order is preserved and a `(key_id, value_id)` pair is stored at
/// most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Metadata>", into = "Vec<Metadata>")]
pub struct MetadataSet {
    entries: Vec<Metadata>,
}

impl MetadataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the pair unless it is already present. Returns true if added.
    pub fn add(&mut self, key_id: i64, value_id: i64) -> bool {
        if self.has_key_value(key_id, value_id) {
            return false;
        }
        self.entries.push(Metadata::new(key_id, value_id));
        true
    }

    /// Remove every entry with `key_id`, restricted to `value_id` when given.
    ///
    /// `None` matches any value. Remaining entries keep their relative order.
    /// Returns the number of removed entries.
    pub fn remove(&mut self, key_id: i64, value_id: Option<i64>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|m| {
            !(m.key_id == key_id && value_id.map_or(true, |v| m.value_id == v))
        });
        before - self.entries.len()
    }

    pub fn has_key(&self, key_id: i64) -> bool {
        self.entries.iter().any(|m| m.key_id == key_id)
    }

    pub fn has_key_value(&self, key_id: i64, value_id: i64) -> bool {
        self.entries
            .iter()
            .any(|m| m.key_id == key_id && m.value_id == value_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Metadata> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Metadata] {
        &self.entries
    }
}

impl From<Vec<Metadata>> for MetadataSet {
    fn from(pairs: Vec<Metadata>) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<MetadataSet> for Vec<Metadata> {
    fn from(set: MetadataSet) -> Self {
        set.entries
    }
}

impl FromIterator<Metadata> for MetadataSet {
    fn from_iter<I: IntoIterator<Item = Metadata>>(iter: I) -> Self {
        let mut set = MetadataSet::new();
        for m in iter {
            set.add(m.key_id, m.value_id);
        }
        set
    }
}

impl<'a> IntoIterator for &'a MetadataSet {
    type Item = &'a Metadata;
    type IntoIter = std::slice::Iter<'a, Metadata>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A managed document: one ingested file plus user-editable fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub user_id: UserId,
    pub name: String,
    pub filename: String,
    pub content: String,
    pub description: String,
    /// Content digest, used as the dedup key.
    pub hash: String,
    /// Preview file name relative to the previews directory. Empty until generated.
    pub preview: String,
    pub date: DateTime<Utc>,
    pub metadata: MetadataSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Create the initial record for a freshly ingested file.
    ///
    /// The filename doubles as the display name and the content starts empty.
    pub fn ingested(user_id: UserId, filename: impl Into<String>, hash: impl Into<String>) -> Self {
        let filename = filename.into();
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id,
            name: filename.clone(),
            filename,
            content: String::new(),
            description: String::new(),
            hash: hash.into(),
            preview: String::new(),
            date: now,
            metadata: MetadataSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the document as modified.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// =============================================================================
// JOB TYPES
// =============================================================================

/// Status of a processing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Finished,
    Failure,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

/// Audit record of one processing attempt against a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub document_id: Uuid,
    pub message: String,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Start a new running job for the document.
    pub fn start(document_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            document_id,
            message: message.into(),
            status: JobStatus::Running,
            started_at: Utc::now(),
            stopped_at: None,
        }
    }

    pub fn finish(&mut self) {
        self.status = JobStatus::Finished;
    }

    /// Mark the job failed and append the reason to its message.
    pub fn fail(&mut self, reason: &str) {
        self.status = JobStatus::Failure;
        self.message.push_str("; ");
        self.message.push_str(reason);
    }

    /// Record the stop time. A job still running at this point is a failure.
    ///
    /// The stop time never precedes the start time.
    pub fn stop(&mut self) {
        if !self.status.is_terminal() {
            self.fail("stopped before completion");
        }
        self.stopped_at = Some(Utc::now().max(self.started_at));
    }
}

// =============================================================================
// PAGING
// =============================================================================

/// Limit/offset paging for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            limit: defaults::PAGE_LIMIT,
            offset: defaults::PAGE_OFFSET,
        }
    }
}

impl Paging {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_add_is_idempotent() {
        let mut set = MetadataSet::new();
        assert!(set.add(1, 10));
        assert!(!set.add(1, 10));
        assert!(set.add(1, 11));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_metadata_remove_any_value() {
        let mut set: MetadataSet = vec![
            Metadata::new(1, 10),
            Metadata::new(2, 20),
            Metadata::new(1, 11),
            Metadata::new(3, 30),
        ]
        .into();

        assert_eq!(set.remove(1, None), 2);
        assert_eq!(
            set.as_slice(),
            &[Metadata::new(2, 20), Metadata::new(3, 30)]
        );
    }

    #[test]
    fn test_metadata_remove_specific_value_preserves_order() {
        let mut set: MetadataSet = vec![
            Metadata::new(1, 10),
            Metadata::new(2, 20),
            Metadata::new(1, 11),
            Metadata::new(3, 30),
        ]
        .into();

        assert_eq!(set.remove(1, Some(11)), 1);
        assert_eq!(
            set.as_slice(),
            &[
                Metadata::new(1, 10),
                Metadata::new(2, 20),
                Metadata::new(3, 30)
            ]
        );
        assert_eq!(set.remove(9, None), 0);
    }

    #[test]
    fn test_metadata_set_dedups_on_deserialize() {
        let set: MetadataSet = serde_json::from_str(
            r#"[{"key_id":1,"value_id":2},{"key_id":1,"value_id":2},{"key_id":3,"value_id":4}]"#,
        )
        .unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.has_key(3));
        assert!(set.has_key_value(1, 2));
        assert!(!set.has_key_value(1, 4));
    }

    #[test]
    fn test_document_ingested_defaults() {
        let doc = Document::ingested(5, "scan.pdf", "abc");
        assert_eq!(doc.name, "scan.pdf");
        assert_eq!(doc.filename, "scan.pdf");
        assert!(doc.content.is_empty());
        assert!(doc.preview.is_empty());
        assert_eq!(doc.hash, "abc");
        assert_eq!(doc.user_id, 5);
        assert!(doc.metadata.is_empty());
    }

    #[test]
    fn test_job_lifecycle_success() {
        let mut job = Job::start(Uuid::nil(), "Generate thumbnail (500x500)");
        assert_eq!(job.status, JobStatus::Running);
        job.finish();
        job.stop();
        assert_eq!(job.status, JobStatus::Finished);
        assert!(job.stopped_at.unwrap() >= job.started_at);
    }

    #[test]
    fn test_job_fail_appends_reason() {
        let mut job = Job::start(Uuid::nil(), "Generate thumbnail (500x500)");
        job.fail("convert: no such file");
        job.stop();
        assert_eq!(job.status, JobStatus::Failure);
        assert_eq!(
            job.message,
            "Generate thumbnail (500x500); convert: no such file"
        );
    }

    #[test]
    fn test_job_stop_while_running_is_terminal() {
        let mut job = Job::start(Uuid::nil(), "work");
        job.stop();
        assert!(job.status.is_terminal());
        assert!(job.stopped_at.is_some());
    }

    #[test]
    fn test_job_status_serde() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Failure).unwrap(),
            "\"failure\""
        );
    }

    #[test]
    fn test_paging_default() {
        let paging = Paging::default();
        assert_eq!(paging.limit, defaults::PAGE_LIMIT);
        assert_eq!(paging.offset, 0);
    }
}
