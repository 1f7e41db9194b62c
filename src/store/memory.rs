use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DocumentStore, StoreDocument, StoreError, seed};

/// Process-local backend; documents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, StoreDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn session_count(&self) -> usize {
        self.documents.read().await.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load(&self, token: &str) -> StoreDocument {
        self.documents
            .read()
            .await
            .get(token)
            .cloned()
            .unwrap_or_else(seed::document)
    }

    async fn save(&self, token: &str, document: &StoreDocument) -> Result<(), StoreError> {
        self.documents
            .write()
            .await
            .insert(token.to_string(), document.clone());
        Ok(())
    }

    async fn get_or_create(&self, token: &str) -> Result<StoreDocument, StoreError> {
        let mut documents = self.documents.write().await;
        let document = documents
            .entry(token.to_string())
            .or_insert_with(seed::document);
        Ok(document.clone())
    }
}
