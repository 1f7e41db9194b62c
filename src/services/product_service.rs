use chrono::Utc;
use rust_decimal::Decimal;

use crate::{
    audit::log_audit,
    dto::products::{DeletedRecord, ProductData, ProductList, ProductStats},
    enrich::{enrich, stock_status},
    error::{AppError, AppResult},
    models::{Product, StockStatus},
    response::ApiResponse,
    routes::params::RequestInput,
    services::{RequestContext, require_id, required_text, validate_slots},
    store::{EntityKind, StoreDocument},
    uploads::ImageSlot,
};

pub const IMAGE_SLOTS: [&str; 4] = ["image", "image_2", "image_3", "image_4"];

pub fn list_products(
    doc: &StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<ProductList>> {
    let search = input.text("search").map(|s| s.to_lowercase());
    let category = input.text("category");
    let wanted_status = input
        .text("stock_status")
        .and_then(|s| StockStatus::parse(&s));

    let products: Vec<Product> = doc
        .products
        .iter()
        .filter(|p| {
            search.as_ref().is_none_or(|needle| {
                p.name.to_lowercase().contains(needle.as_str())
                    || p.description.to_lowercase().contains(needle.as_str())
            })
        })
        .filter(|p| category.as_ref().is_none_or(|slug| &p.category == slug))
        .filter(|p| wanted_status.is_none_or(|status| stock_status(p.stock) == status))
        .cloned()
        .map(|p| enrich(p, &ctx.config.asset_base_url))
        .collect();

    let data = ProductList {
        total: products.len(),
        products,
        stats: product_stats(&doc.products),
    };
    Ok(ApiResponse::data(data))
}

/// Catalogue-wide counts, independent of any list filter.
pub fn product_stats(products: &[Product]) -> ProductStats {
    let mut stats = ProductStats {
        total: products.len(),
        ..ProductStats::default()
    };
    for product in products {
        match stock_status(product.stock) {
            StockStatus::InStock => stats.in_stock += 1,
            StockStatus::LowStock => stats.low_stock += 1,
            StockStatus::OutOfStock => stats.out_of_stock += 1,
        }
        *stats.by_category.entry(product.category.clone()).or_default() += 1;
    }
    stats
}

pub fn get_product(
    doc: &StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<ProductData>> {
    let id = require_id(input, "id")?;
    let product = doc
        .products
        .iter()
        .find(|p| p.id == id)
        .cloned()
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;
    Ok(ApiResponse::data(ProductData {
        product: enrich(product, &ctx.config.asset_base_url),
    }))
}

fn heat_level(input: &RequestInput) -> Option<u8> {
    input.i64("heat_level").map(|level| level.clamp(1, 5) as u8)
}

fn rating(input: &RequestInput) -> Option<f64> {
    input.f64("rating").map(|r| r.clamp(0.0, 5.0))
}

fn price(input: &RequestInput) -> Option<Decimal> {
    input.decimal("price").map(|p| p.max(Decimal::ZERO))
}

pub async fn create_product(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<ProductData>> {
    let name = required_text(input, "name", "Product name")?;
    validate_slots(input, &IMAGE_SLOTS)?;

    let mut images: [Option<String>; 4] = Default::default();
    for (slot, key) in images.iter_mut().zip(IMAGE_SLOTS) {
        *slot = ctx.apply_slot(ImageSlot::from_input(input, key), None).await?;
    }
    let [image, image_2, image_3, image_4] = images;

    let now = Utc::now();
    let product = Product {
        id: doc.next_id(EntityKind::Product),
        name,
        description: input.text_or_default("description"),
        price: price(input).unwrap_or(Decimal::ZERO),
        stock: input.i64_or("stock", 0).max(0),
        category: input.text_or_default("category"),
        image,
        image_2,
        image_3,
        image_4,
        heat_level: heat_level(input),
        rating: rating(input).unwrap_or(0.0),
        badge: input.text_or_default("badge"),
        origin: input.text_or_default("origin"),
        supplier: input.text_or_default("supplier"),
        weight_kg: input.f64("weight_kg").map(|w| w.max(0.0)),
        created_at: now,
        updated_at: now,
        stock_status: None,
        image_url: None,
        image_url_candidates: None,
    };
    doc.products.push(product.clone());

    log_audit(
        ctx.session,
        "product_create",
        "products",
        Some(serde_json::json!({ "product_id": product.id })),
    );

    Ok(ApiResponse::success(
        "Product created",
        ProductData {
            product: enrich(product, &ctx.config.asset_base_url),
        },
    )
    .created())
}

pub async fn update_product(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<ProductData>> {
    let id = require_id(input, "id")?;
    validate_slots(input, &IMAGE_SLOTS)?;
    let product = doc
        .products
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;

    if let Some(name) = input.text("name") {
        product.name = name;
    }
    if let Some(description) = input.raw_text("description") {
        product.description = description;
    }
    if let Some(price) = price(input) {
        product.price = price;
    }
    if let Some(stock) = input.i64("stock") {
        product.stock = stock.max(0);
    }
    if let Some(category) = input.raw_text("category") {
        product.category = category;
    }
    if input.has("heat_level") {
        product.heat_level = heat_level(input);
    }
    if let Some(rating) = rating(input) {
        product.rating = rating;
    }
    if let Some(badge) = input.raw_text("badge") {
        product.badge = badge;
    }
    if let Some(origin) = input.raw_text("origin") {
        product.origin = origin;
    }
    if let Some(supplier) = input.raw_text("supplier") {
        product.supplier = supplier;
    }
    if let Some(weight) = input.f64("weight_kg") {
        product.weight_kg = Some(weight.max(0.0));
    }

    for key in IMAGE_SLOTS {
        let slot = ImageSlot::from_input(input, key);
        if matches!(slot, ImageSlot::Unchanged) {
            continue;
        }
        let current = match key {
            "image" => &mut product.image,
            "image_2" => &mut product.image_2,
            "image_3" => &mut product.image_3,
            _ => &mut product.image_4,
        };
        *current = ctx.apply_slot(slot, current.clone()).await?;
        if key == "image" {
            // Derived URLs belong to the old main image.
            product.image_url = None;
            product.image_url_candidates = None;
        }
    }

    product.updated_at = Utc::now();
    let product = product.clone();

    log_audit(
        ctx.session,
        "product_update",
        "products",
        Some(serde_json::json!({ "product_id": product.id })),
    );

    Ok(ApiResponse::success(
        "Product updated",
        ProductData {
            product: enrich(product, &ctx.config.asset_base_url),
        },
    ))
}

pub async fn delete_product(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<DeletedRecord>> {
    let id = require_id(input, "id")?;
    let position = doc
        .products
        .iter()
        .position(|p| p.id == id)
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;
    let removed = doc.products.remove(position);

    ctx.discard_images([removed.image, removed.image_2, removed.image_3, removed.image_4]);

    log_audit(
        ctx.session,
        "product_delete",
        "products",
        Some(serde_json::json!({ "product_id": id })),
    );

    Ok(ApiResponse::success("Product deleted", DeletedRecord { id }))
}
