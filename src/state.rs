use std::sync::Arc;

use crate::{
    config::{AppConfig, StoreBackend},
    store::{DocumentStore, FileStore, MemoryStore},
    uploads::UploadStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub uploads: UploadStore,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>) -> Self {
        let uploads = UploadStore::new(&config.uploads_dir, config.uploads_url_prefix.clone());
        Self {
            store,
            uploads,
            config: Arc::new(config),
        }
    }

    /// State with the backend selected by `config.store_backend`.
    pub fn from_config(config: AppConfig) -> Self {
        let store: Arc<dyn DocumentStore> = match config.store_backend {
            StoreBackend::File => Arc::new(FileStore::new(&config.data_dir)),
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        };
        Self::new(config, store)
    }
}
