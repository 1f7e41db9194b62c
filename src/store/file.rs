use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{DocumentStore, StoreDocument, StoreError, seed};

/// One pretty-printed JSON file per session under `data_dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path_for(&self, token: &str) -> PathBuf {
        self.data_dir.join(format!("{token}.json"))
    }

    async fn read(&self, token: &str) -> Option<StoreDocument> {
        let path = self.path_for(token);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "session document unreadable");
                return None;
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(document) => Some(document),
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "session document corrupt, reseeding");
                None
            }
        }
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn load(&self, token: &str) -> StoreDocument {
        match self.read(token).await {
            Some(document) => document,
            None => seed::document(),
        }
    }

    async fn save(&self, token: &str, document: &StoreDocument) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir).await?;
        let json = serde_json::to_vec_pretty(document)?;
        // Rename over the old file so readers never see a partial document.
        let tmp = self.data_dir.join(format!("{token}.json.tmp"));
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, self.path_for(token)).await?;
        Ok(())
    }

    async fn get_or_create(&self, token: &str) -> Result<StoreDocument, StoreError> {
        if let Some(document) = self.read(token).await {
            return Ok(document);
        }
        let document = seed::document();
        self.save(token, &document).await?;
        tracing::debug!(session = %token, "seeded new session document");
        Ok(document)
    }
}
