use crate::errors::Result;
use crate::models::{DocumentSummary, StoredDocument};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Storage for ingested documents
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn insert(&self, document: StoredDocument) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<Arc<StoredDocument>>>;

    /// Documents in upload order
    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<DocumentSummary>>;

    /// Remove a document, returning it if it existed
    async fn delete(&self, id: &str) -> Result<Option<Arc<StoredDocument>>>;

    async fn count(&self) -> Result<usize>;
}

/// Documents held in process memory
#[derive(Default)]
pub struct InMemoryDocumentRepository {
    documents: RwLock<HashMap<String, Arc<StoredDocument>>>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn insert(&self, document: StoredDocument) -> Result<()> {
        self.documents
            .write()
            .await
            .insert(document.id.clone(), Arc::new(document));
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Arc<StoredDocument>>> {
        Ok(self.documents.read().await.get(id).cloned())
    }

    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<DocumentSummary>> {
        let mut summaries: Vec<DocumentSummary> = self
            .documents
            .read()
            .await
            .values()
            .map(|d| d.summary())
            .collect();
        summaries.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then_with(|| a.id.cmp(&b.id)));

        Ok(summaries.into_iter().skip(skip).take(limit).collect())
    }

    async fn delete(&self, id: &str) -> Result<Option<Arc<StoredDocument>>> {
        Ok(self.documents.write().await.remove(id))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.documents.read().await.len())
    }
}
