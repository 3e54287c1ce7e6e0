//! Document repository implementation.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use vpaper_core::{Document, DocumentRepository, Error, Paging, Result, UserId};

/// In-memory implementation of DocumentRepository.
///
/// Documents are kept in insertion order; the content hash is unique.
#[derive(Default)]
pub struct MemDocumentRepository {
    docs: RwLock<Vec<Document>>,
}

impl MemDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub async fn count(&self) -> usize {
        self.docs.read().await.len()
    }
}

#[async_trait]
impl DocumentRepository for MemDocumentRepository {
    async fn get_by_hash(&self, hash: &str) -> Result<Option<Document>> {
        let docs = self.docs.read().await;
        Ok(docs.iter().find(|d| d.hash == hash).cloned())
    }

    async fn create(&self, doc: &Document) -> Result<Uuid> {
        let mut docs = self.docs.write().await;
        if docs.iter().any(|d| d.hash == doc.hash) {
            return Err(Error::Duplicate(format!(
                "document with hash {} already exists",
                doc.hash
            )));
        }
        if docs.iter().any(|d| d.id == doc.id) {
            return Err(Error::Duplicate(format!("document id {} already exists", doc.id)));
        }
        docs.push(doc.clone());
        debug!(document_id = %doc.id, hash = %doc.hash, "Stored document");
        Ok(doc.id)
    }

    async fn update(&self, doc: &Document) -> Result<()> {
        let mut docs = self.docs.write().await;
        let stored = docs
            .iter_mut()
            .find(|d| d.id == doc.id)
            .ok_or(Error::DocumentNotFound(doc.id))?;
        *stored = doc.clone();
        Ok(())
    }

    async fn get_documents(&self, user_id: UserId, paging: Paging) -> Result<(Vec<Document>, i64)> {
        if paging.limit < 0 || paging.offset < 0 {
            return Err(Error::InvalidInput(
                "paging limit and offset must be non-negative".to_string(),
            ));
        }
        let docs = self.docs.read().await;
        let mut owned: Vec<&Document> = docs.iter().filter(|d| d.user_id == user_id).collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = owned.len() as i64;
        let page = owned
            .into_iter()
            .skip(paging.offset as usize)
            .take(paging.limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn get_document(&self, user_id: UserId, id: Uuid) -> Result<Document> {
        let docs = self.docs.read().await;
        docs.iter()
            .find(|d| d.id == id && d.user_id == user_id)
            .cloned()
            .ok_or(Error::DocumentNotFound(id))
    }

    async fn user_owns_document(&self, id: Uuid, user_id: UserId) -> Result<bool> {
        let docs = self.docs.read().await;
        Ok(docs.iter().any(|d| d.id == id && d.user_id == user_id))
    }
}
