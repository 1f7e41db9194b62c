use std::{env, path::PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    File,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub uploads_dir: PathBuf,
    /// Public URL prefix the uploads directory is served under.
    pub uploads_url_prefix: String,
    /// Prefix for product images stored as bare file names.
    pub asset_base_url: String,
    /// Host fragment identifying image links from the old shop in spreadsheets.
    pub legacy_image_host: String,
    pub store_backend: StoreBackend,
    pub max_body_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let data_dir = env::var("DEMO_DATA_DIR").unwrap_or_else(|_| "demo-data".to_string());
        let uploads_dir =
            env::var("DEMO_UPLOADS_DIR").unwrap_or_else(|_| "public/demo-uploads".to_string());
        let asset_base_url = env::var("ASSET_BASE_URL")
            .unwrap_or_else(|_| "https://assets.hot-sauce-shop.ch/images/".to_string());
        let legacy_image_host =
            env::var("LEGACY_IMAGE_HOST").unwrap_or_else(|_| "bilder.hot-sauce-shop.ch".to_string());
        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Err(_) | Ok("file") => StoreBackend::File,
            Ok("memory") => StoreBackend::Memory,
            Ok(other) => anyhow::bail!("unknown STORE_BACKEND `{other}` (expected file or memory)"),
        };
        let max_body_bytes = env::var("MAX_BODY_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(10 * 1024 * 1024);

        Ok(Self {
            host,
            port,
            data_dir: PathBuf::from(data_dir),
            uploads_dir: PathBuf::from(uploads_dir),
            uploads_url_prefix: "/demo-uploads".to_string(),
            asset_base_url,
            legacy_image_host,
            store_backend,
            max_body_bytes,
        })
    }

    /// Configuration rooted in `dir`, used by tests and tooling.
    pub fn for_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            data_dir: dir.join("demo-data"),
            uploads_dir: dir.join("demo-uploads"),
            uploads_url_prefix: "/demo-uploads".to_string(),
            asset_base_url: "https://assets.hot-sauce-shop.ch/images/".to_string(),
            legacy_image_host: "bilder.hot-sauce-shop.ch".to_string(),
            store_backend: StoreBackend::File,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}
