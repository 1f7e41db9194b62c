//! Display fields derived from stored product data.

use crate::models::{Product, StockStatus};

/// Stock at or below this count is reported as `low_stock`.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "webp", "gif", "svg", "avif"];

/// Extensions tried, in order, when an image reference has none.
const CANDIDATE_EXTENSIONS: [&str; 5] = [".jpg", ".JPG", ".jpeg", ".png", ".webp"];

pub fn stock_status(stock: i64) -> StockStatus {
    if stock <= 0 {
        StockStatus::OutOfStock
    } else if stock <= LOW_STOCK_THRESHOLD {
        StockStatus::LowStock
    } else {
        StockStatus::InStock
    }
}

pub fn is_absolute_url(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("//")
}

pub fn has_image_extension(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rsplit_once('.') {
        Some((_, ext)) => IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// Resolves a stored image reference to the URL list a client should try.
pub fn image_candidates(image: &str, asset_base: &str) -> Vec<String> {
    let image = image.trim();
    if image.is_empty() {
        return Vec::new();
    }
    if is_absolute_url(image) || image.starts_with('/') {
        return vec![image.to_string()];
    }

    let url = format!("{}{}", asset_base, image.trim_start_matches('/'));
    if has_image_extension(&url) {
        vec![url]
    } else {
        CANDIDATE_EXTENSIONS
            .iter()
            .map(|ext| format!("{url}{ext}"))
            .collect()
    }
}

/// Fills `stock_status`, `image_url` and `image_url_candidates`.
///
/// Values already present on the product are kept, so enriching twice is the
/// same as enriching once.
pub fn enrich(mut product: Product, asset_base: &str) -> Product {
    product.stock_status = Some(stock_status(product.stock));

    if product.image_url.is_none() || product.image_url_candidates.is_none() {
        let derived = product
            .image
            .as_deref()
            .map(|image| image_candidates(image, asset_base))
            .unwrap_or_default();

        if product.image_url_candidates.is_none() {
            product.image_url_candidates = Some(match &product.image_url {
                Some(explicit) => vec![explicit.clone()],
                None => derived.clone(),
            });
        }
        if product.image_url.is_none() {
            product.image_url = derived.into_iter().next();
        }
    }

    product
}
