//! Image uploads and the per-slot replace/remove/keep protocol.

use std::{
    path::PathBuf,
    sync::{Mutex, PoisonError},
};

use chrono::Utc;
use tokio::fs;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    routes::params::{RequestInput, UploadedFile},
};

const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

#[derive(Debug, Clone)]
pub enum ImageSource {
    Upload(UploadedFile),
    Url(String),
}

/// Instruction for one image slot of a create or edit request.
#[derive(Debug, Clone)]
pub enum ImageSlot {
    Unchanged,
    Replace(ImageSource),
    Remove,
}

impl ImageSlot {
    /// Reads slot `key`: an uploaded file beats `remove_<key>`, which beats
    /// `keep_<key>`; a plain text value under `key` is taken as a URL.
    pub fn from_input(input: &RequestInput, key: &str) -> Self {
        if let Some(file) = input.file(key) {
            return ImageSlot::Replace(ImageSource::Upload(file.clone()));
        }
        if input.flag(&format!("remove_{key}")) {
            return ImageSlot::Remove;
        }
        if input.flag(&format!("keep_{key}")) {
            return ImageSlot::Unchanged;
        }
        match input.text(key) {
            Some(url) => ImageSlot::Replace(ImageSource::Url(url)),
            None => ImageSlot::Unchanged,
        }
    }
}

/// Writes uploaded images below `root`, served publicly under `url_prefix`.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    url_prefix: String,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into(),
        }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Stores `file` as `{session}_{timestamp}_{random}.{ext}` and returns its public path.
    pub async fn save(&self, session: &str, file: &UploadedFile) -> AppResult<String> {
        let ext = validate(file)?;

        let random = Uuid::new_v4().simple().to_string();
        let name = format!(
            "{}_{}_{}.{}",
            session,
            Utc::now().timestamp_millis(),
            &random[..8],
            ext
        );

        fs::create_dir_all(&self.root)
            .await
            .map_err(|err| AppError::Internal(err.into()))?;
        fs::write(self.root.join(&name), &file.bytes)
            .await
            .map_err(|err| AppError::Internal(err.into()))?;

        tracing::debug!(file = %name, bytes = file.bytes.len(), "stored upload");
        Ok(format!("{}/{}", self.url_prefix.trim_end_matches('/'), name))
    }

    /// Deletes a file previously returned by [`UploadStore::save`]; other paths are ignored.
    pub async fn remove(&self, public_path: &str) {
        let prefix = format!("{}/", self.url_prefix.trim_end_matches('/'));
        let Some(name) = public_path.strip_prefix(&prefix) else {
            return;
        };
        if name.contains('/') || name.contains("..") {
            return;
        }
        if let Err(err) = fs::remove_file(self.root.join(name)).await {
            tracing::warn!(error = %err, file = %name, "could not remove upload");
        }
    }
}

/// Checks that `file` is an image by extension and, when sent, by MIME type.
/// Returns the normalized extension.
pub fn validate(file: &UploadedFile) -> AppResult<String> {
    let ext = image_extension(&file.file_name).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Unsupported image type `{}` (allowed: {})",
            file.file_name,
            ALLOWED_EXTENSIONS.join(", ")
        ))
    })?;
    if let Some(mime) = file.content_type.as_deref() {
        let mime = mime.trim().to_ascii_lowercase();
        if !(mime.starts_with("image/") || mime == "application/octet-stream") {
            return Err(AppError::BadRequest(format!(
                "`{}` was sent as {mime}, not as an image",
                file.file_name
            )));
        }
    }
    Ok(ext)
}

#[derive(Debug, Default)]
struct Pending {
    written: Vec<String>,
    discarded: Vec<String>,
}

/// File side effects of one request. New uploads are remembered so a failed
/// request can delete them again; replaced or deleted images are only removed
/// once the request has been saved.
#[derive(Debug, Default)]
pub struct UploadBatch {
    pending: Mutex<Pending>,
}

impl UploadBatch {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_pending<R>(&self, f: impl FnOnce(&mut Pending) -> R) -> R {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut pending)
    }

    pub fn record_written(&self, path: impl Into<String>) {
        let path = path.into();
        self.with_pending(|p| p.written.push(path));
    }

    /// Queues `path` for deletion on commit.
    pub fn discard(&self, path: impl Into<String>) {
        let path = path.into();
        self.with_pending(|p| p.discarded.push(path));
    }

    pub fn written(&self) -> Vec<String> {
        self.with_pending(|p| p.written.clone())
    }

    pub fn discarded(&self) -> Vec<String> {
        self.with_pending(|p| p.discarded.clone())
    }

    /// The request's document is stored: drop the files it no longer references.
    pub async fn commit(&self, store: &UploadStore) {
        let discarded = self.with_pending(|p| {
            p.written.clear();
            std::mem::take(&mut p.discarded)
        });
        for path in discarded {
            store.remove(&path).await;
        }
    }

    /// The request failed: drop what it uploaded and keep everything else.
    pub async fn rollback(&self, store: &UploadStore) {
        let written = self.with_pending(|p| {
            p.discarded.clear();
            std::mem::take(&mut p.written)
        });
        if !written.is_empty() {
            tracing::debug!(files = written.len(), "rolling back uploads of failed request");
        }
        for path in written {
            store.remove(&path).await;
        }
    }
}

fn image_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

#[cfg(test)]
mod tests {
    use axum::body::Bytes;

    use super::*;

    fn png(name: &str) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: Some("image/png".to_string()),
            bytes: Bytes::from_static(b"\x89PNG"),
        }
    }

    #[test]
    fn upload_beats_remove_beats_keep() {
        let input = RequestInput::new()
            .with_field("remove_image", "1")
            .with_field("keep_image", "1")
            .with_file("image", png("a.png"));
        assert!(matches!(
            ImageSlot::from_input(&input, "image"),
            ImageSlot::Replace(ImageSource::Upload(_))
        ));

        let input = RequestInput::new()
            .with_field("remove_image", "1")
            .with_field("keep_image", "1");
        assert!(matches!(ImageSlot::from_input(&input, "image"), ImageSlot::Remove));

        let input = RequestInput::new()
            .with_field("keep_image", "1")
            .with_field("image", "https://x/y.png");
        assert!(matches!(ImageSlot::from_input(&input, "image"), ImageSlot::Unchanged));
    }

    #[test]
    fn absent_instructions_keep_the_slot() {
        let input = RequestInput::new();
        assert!(matches!(ImageSlot::from_input(&input, "image_2"), ImageSlot::Unchanged));
    }

    #[test]
    fn text_value_is_a_url_replacement() {
        let input = RequestInput::new().with_field("image_3", "sauce.jpg");
        match ImageSlot::from_input(&input, "image_3") {
            ImageSlot::Replace(ImageSource::Url(url)) => assert_eq!(url, "sauce.jpg"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn save_names_file_after_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), "/demo-uploads");
        let path = store.save("abc", &png("Photo.PNG")).await.unwrap();
        assert!(path.starts_with("/demo-uploads/abc_"));
        assert!(path.ends_with(".png"));
        let name = path.trim_start_matches("/demo-uploads/");
        assert!(dir.path().join(name).exists());

        store.remove(&path).await;
        assert!(!dir.path().join(name).exists());
    }

    #[tokio::test]
    async fn rollback_removes_only_new_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), "/demo-uploads");
        let kept = store.save("abc", &png("old.png")).await.unwrap();

        let batch = UploadBatch::new();
        let fresh = store.save("abc", &png("new.png")).await.unwrap();
        batch.record_written(fresh.clone());
        batch.discard(kept.clone());
        batch.rollback(&store).await;

        let file = |path: &str| dir.path().join(path.trim_start_matches("/demo-uploads/"));
        assert!(file(&kept).exists());
        assert!(!file(&fresh).exists());
    }

    #[tokio::test]
    async fn commit_removes_discarded_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), "/demo-uploads");
        let old = store.save("abc", &png("old.png")).await.unwrap();

        let batch = UploadBatch::new();
        batch.discard(old.clone());
        batch.commit(&store).await;
        assert!(!dir.path().join(old.trim_start_matches("/demo-uploads/")).exists());
    }

    #[test]
    fn mime_type_must_be_an_image() {
        let mut file = png("photo.png");
        file.content_type = Some("text/x-php".to_string());
        assert!(matches!(validate(&file), Err(AppError::BadRequest(_))));

        file.content_type = None;
        assert_eq!(validate(&file).unwrap(), "png");
    }

    #[tokio::test]
    async fn rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), "/demo-uploads");
        let err = store.save("abc", &png("script.php")).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
