use chrono::Utc;

use crate::{
    audit::log_audit,
    dto::categories::{CategoryData, CategoryDeleted, CategoryList, CategoryWithCount},
    error::{AppError, AppResult},
    models::Category,
    response::ApiResponse,
    routes::params::RequestInput,
    services::{RequestContext, require_id, required_text},
    slug::slugify,
    store::{EntityKind, StoreDocument},
};

pub fn list_categories(doc: &StoreDocument) -> AppResult<ApiResponse<CategoryList>> {
    let categories: Vec<CategoryWithCount> = doc
        .categories
        .iter()
        .map(|category| CategoryWithCount {
            product_count: doc
                .products
                .iter()
                .filter(|p| p.category == category.slug)
                .count(),
            category: category.clone(),
        })
        .collect();

    Ok(ApiResponse::data(CategoryList {
        total: categories.len(),
        categories,
    }))
}

fn slug_for(name: &str) -> AppResult<String> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(AppError::BadRequest(
            "Category name must contain letters or digits".into(),
        ));
    }
    Ok(slug)
}

/// Finds the category for `slug`, creating it from `name` when missing.
/// Returns whether a category was created.
pub fn ensure_category(doc: &mut StoreDocument, slug: &str, name: &str) -> bool {
    if doc.categories.iter().any(|c| c.slug == slug) {
        return false;
    }
    let id = doc.next_id(EntityKind::Category);
    doc.categories.push(Category {
        id,
        slug: slug.to_string(),
        name: name.to_string(),
        description: String::new(),
        created_at: Utc::now(),
    });
    true
}

pub fn create_category(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<CategoryData>> {
    let name = required_text(input, "name", "Category name")?;
    let slug = slug_for(&name)?;
    if doc.categories.iter().any(|c| c.slug == slug) {
        return Err(AppError::BadRequest(format!(
            "A category with slug `{slug}` already exists"
        )));
    }

    let category = Category {
        id: doc.next_id(EntityKind::Category),
        slug,
        name,
        description: input.text_or_default("description"),
        created_at: Utc::now(),
    };
    doc.categories.push(category.clone());

    log_audit(
        ctx.session,
        "category_create",
        "categories",
        Some(serde_json::json!({ "category_id": category.id, "slug": category.slug })),
    );

    Ok(ApiResponse::success("Category created", CategoryData { category }).created())
}

pub fn update_category(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<CategoryData>> {
    let id = require_id(input, "id")?;
    let position = doc
        .categories
        .iter()
        .position(|c| c.id == id)
        .ok_or_else(|| AppError::NotFound("Category not found".into()))?;

    if let Some(name) = input.text("name") {
        let slug = slug_for(&name)?;
        let old_slug = doc.categories[position].slug.clone();
        if slug != old_slug {
            if doc.categories.iter().any(|c| c.slug == slug) {
                return Err(AppError::BadRequest(format!(
                    "A category with slug `{slug}` already exists"
                )));
            }
            for product in doc.products.iter_mut().filter(|p| p.category == old_slug) {
                product.category = slug.clone();
            }
        }
        let category = &mut doc.categories[position];
        category.name = name;
        category.slug = slug;
    }
    if let Some(description) = input.raw_text("description") {
        doc.categories[position].description = description;
    }

    let category = doc.categories[position].clone();
    log_audit(
        ctx.session,
        "category_update",
        "categories",
        Some(serde_json::json!({ "category_id": category.id })),
    );

    Ok(ApiResponse::success("Category updated", CategoryData { category }))
}

/// Removes the category without touching products that still reference it.
pub fn delete_category(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<CategoryDeleted>> {
    let id = require_id(input, "id")?;
    let position = doc
        .categories
        .iter()
        .position(|c| c.id == id)
        .ok_or_else(|| AppError::NotFound("Category not found".into()))?;
    let removed = doc.categories.remove(position);

    let orphaned_products = doc
        .products
        .iter()
        .filter(|p| p.category == removed.slug)
        .count();
    if orphaned_products > 0 {
        tracing::warn!(
            slug = %removed.slug,
            orphaned_products,
            "category deleted while products still reference it"
        );
    }

    log_audit(
        ctx.session,
        "category_delete",
        "categories",
        Some(serde_json::json!({ "category_id": id })),
    );

    Ok(ApiResponse::success(
        "Category deleted",
        CategoryDeleted {
            id,
            slug: removed.slug,
            orphaned_products,
        },
    ))
}
