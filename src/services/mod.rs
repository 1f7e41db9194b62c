use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    routes::params::RequestInput,
    uploads::{self, ImageSlot, ImageSource, UploadBatch, UploadStore},
};

pub mod category_service;
pub mod content_service;
pub mod import_service;
pub mod order_service;
pub mod product_service;
pub mod settings_service;
pub mod user_service;

/// Per-request collaborators handed to the services alongside the document.
#[derive(Clone, Copy)]
pub struct RequestContext<'a> {
    pub session: &'a str,
    pub config: &'a AppConfig,
    pub uploads: &'a UploadStore,
    pub batch: &'a UploadBatch,
}

impl RequestContext<'_> {
    /// Resolves one image slot against its current value. Replaced or removed
    /// images are queued on the batch instead of being deleted right away.
    pub async fn apply_slot(
        &self,
        slot: ImageSlot,
        current: Option<String>,
    ) -> AppResult<Option<String>> {
        let next = match slot {
            ImageSlot::Unchanged => return Ok(current),
            ImageSlot::Remove => None,
            ImageSlot::Replace(ImageSource::Url(url)) => Some(url),
            ImageSlot::Replace(ImageSource::Upload(file)) => {
                let path = self.uploads.save(self.session, &file).await?;
                self.batch.record_written(path.clone());
                Some(path)
            }
        };
        if let Some(old) = current.filter(|old| Some(old) != next.as_ref()) {
            self.batch.discard(old);
        }
        Ok(next)
    }

    /// Queues the images of a deleted record for removal.
    pub fn discard_images(&self, images: impl IntoIterator<Item = Option<String>>) {
        for image in images.into_iter().flatten() {
            self.batch.discard(image);
        }
    }
}

/// Rejects the request before anything is written when any slot carries a
/// file that is not an image.
pub(crate) fn validate_slots(input: &RequestInput, keys: &[&str]) -> AppResult<()> {
    for key in keys {
        if let Some(file) = input.file(key) {
            uploads::validate(file)?;
        }
    }
    Ok(())
}

/// Positive record id from `key`, or a 400.
pub(crate) fn require_id(input: &RequestInput, key: &str) -> AppResult<i64> {
    match input.i64(key) {
        Some(id) if id > 0 => Ok(id),
        Some(_) => Err(AppError::BadRequest(format!("Invalid {key}"))),
        None => Err(AppError::BadRequest(format!("Missing {key}"))),
    }
}

pub(crate) fn required_text(input: &RequestInput, key: &str, label: &str) -> AppResult<String> {
    input
        .text(key)
        .ok_or_else(|| AppError::BadRequest(format!("{label} is required")))
}
