use chrono::Utc;
use rust_decimal::Decimal;

use crate::{
    audit::log_audit,
    dto::products::ImportSummary,
    error::{AppError, AppResult},
    import::{ImportedProduct, ParsedSheet, Sheet, parse_sheet, read_workbook},
    models::Product,
    response::ApiResponse,
    routes::params::RequestInput,
    services::{RequestContext, category_service::ensure_category},
    store::{EntityKind, StoreDocument},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// The catalogue becomes exactly the imported rows.
    Replace,
    /// Rows update the product with the same id, or are added.
    Merge,
}

impl ImportMode {
    fn as_str(&self) -> &'static str {
        match self {
            ImportMode::Replace => "replace",
            ImportMode::Merge => "merge",
        }
    }
}

fn apply_row(product: &mut Product, row: &ImportedProduct, category: &str) {
    product.name = row.name.clone();
    if let Some(price) = row.price {
        product.price = price;
    }
    if let Some(stock) = row.stock {
        product.stock = stock;
    }
    for (value, field) in [
        (&row.description, &mut product.description),
        (&row.supplier, &mut product.supplier),
        (&row.origin, &mut product.origin),
    ] {
        if !value.is_empty() {
            *field = value.clone();
        }
    }
    product.category = category.to_string();
    product.image = Some(row.image.clone());
    product.image_url = None;
    product.image_url_candidates = None;
    product.stock_status = None;
    product.updated_at = Utc::now();
}

fn new_product(row: &ImportedProduct, category: &str) -> Product {
    let now = Utc::now();
    Product {
        id: row.id,
        name: row.name.clone(),
        description: row.description.clone(),
        price: row.price.unwrap_or(Decimal::ZERO),
        stock: row.stock.unwrap_or(0),
        category: category.to_string(),
        image: Some(row.image.clone()),
        image_2: None,
        image_3: None,
        image_4: None,
        heat_level: None,
        rating: 0.0,
        badge: String::new(),
        origin: row.origin.clone(),
        supplier: row.supplier.clone(),
        weight_kg: None,
        created_at: now,
        updated_at: now,
        stock_status: None,
        image_url: None,
        image_url_candidates: None,
    }
}

/// Folds parsed worksheets into the catalogue. `total` is the catalogue size afterwards.
/// Nothing changes unless at least one sheet has a recognizable header row.
pub fn import_sheets(
    doc: &mut StoreDocument,
    sheets: &[Sheet],
    legacy_host: &str,
    mode: ImportMode,
) -> AppResult<ImportSummary> {
    let parsed: Vec<ParsedSheet> = sheets
        .iter()
        .filter_map(|sheet| {
            let parsed = parse_sheet(sheet, legacy_host);
            if parsed.is_none() {
                tracing::debug!(sheet = %sheet.name, "no header row found, sheet ignored");
            }
            parsed
        })
        .collect();
    if parsed.is_empty() {
        return Err(AppError::BadRequest(
            "No worksheet has a header row with product number and name columns".into(),
        ));
    }

    let mut summary = ImportSummary::default();
    if mode == ImportMode::Replace {
        doc.products.clear();
    }

    for parsed in parsed {
        summary.skipped += parsed.skipped;
        if parsed.category_slug.is_empty() {
            summary.skipped += parsed.products.len();
            continue;
        }
        if ensure_category(doc, &parsed.category_slug, &parsed.category_name) {
            summary.categories_created += 1;
        }

        for row in &parsed.products {
            match doc.products.iter_mut().find(|p| p.id == row.id) {
                Some(existing) => {
                    apply_row(existing, row, &parsed.category_slug);
                    summary.updated += 1;
                }
                None => {
                    doc.products.push(new_product(row, &parsed.category_slug));
                    summary.inserted += 1;
                }
            }
            doc.next_ids.bump_past(EntityKind::Product, row.id);
        }
    }

    summary.total = doc.products.len();
    Ok(summary)
}

pub fn import_products(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
    mode: ImportMode,
) -> AppResult<ApiResponse<ImportSummary>> {
    let file = input
        .file("file")
        .ok_or_else(|| AppError::BadRequest("No spreadsheet uploaded".into()))?;
    let sheets = read_workbook(&file.bytes)?;
    let summary = import_sheets(doc, &sheets, &ctx.config.legacy_image_host, mode)?;

    log_audit(
        ctx.session,
        "product_import",
        "products",
        Some(serde_json::json!({
            "mode": mode.as_str(),
            "file": file.file_name,
            "inserted": summary.inserted,
            "updated": summary.updated,
            "skipped": summary.skipped,
        })),
    );

    let message = format!(
        "Import finished: {} added, {} updated, {} skipped",
        summary.inserted, summary.updated, summary.skipped
    );
    Ok(ApiResponse::success(message, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::seed;

    fn sheet(name: &str, rows: &[&[&str]]) -> Sheet {
        Sheet {
            name: name.to_string(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn merge_updates_matching_id_in_place() {
        let mut doc = seed::document();
        let before = doc.products.len();
        let sheets = [sheet(
            "Hot Sauce",
            &[&["Nr", "Bezeichnung", "Preis"], &["2", "Smoky Chipotle XL", "11.50"]],
        )];
        let summary = import_sheets(&mut doc, &sheets, "", ImportMode::Merge).unwrap();

        assert_eq!(summary.updated, 1);
        assert_eq!(summary.inserted, 0);
        assert_eq!(summary.categories_created, 0);
        assert_eq!(doc.products.len(), before);
        let p = doc.products.iter().find(|p| p.id == 2).unwrap();
        assert_eq!(p.name, "Smoky Chipotle XL");
        assert_eq!(p.price, Decimal::new(1150, 2));
        assert_eq!(p.stock, 8);
    }

    #[test]
    fn replace_drops_previous_catalogue_and_advances_ids() {
        let mut doc = seed::document();
        let sheets = [sheet(
            "Gewürze",
            &[&["ID", "Name", "Stock"], &["40", "Rauchsalz", "3"], &["x", "Bad", "1"]],
        )];
        let summary = import_sheets(&mut doc, &sheets, "", ImportMode::Replace).unwrap();

        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.categories_created, 1);
        assert_eq!(summary.total, 1);
        assert_eq!(doc.products[0].category, "gewuerze");
        assert_eq!(doc.next_id(EntityKind::Product), 41);
    }

    #[test]
    fn headerless_workbook_leaves_catalogue_alone() {
        let mut doc = seed::document();
        let sheets = [sheet("Notizen", &[&["Einkauf", "morgen"], &["Chili", "Salz"]])];
        let err = import_sheets(&mut doc, &sheets, "", ImportMode::Replace).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(doc.products.len(), 6);
        assert_eq!(doc.categories.len(), 2);
    }

    #[test]
    fn missing_file_is_rejected() {
        let mut doc = seed::document();
        let config = crate::config::AppConfig::for_dir(std::env::temp_dir());
        let uploads = crate::uploads::UploadStore::new(&config.uploads_dir, "/demo-uploads");
        let batch = crate::uploads::UploadBatch::new();
        let ctx = RequestContext {
            session: "test",
            config: &config,
            uploads: &uploads,
            batch: &batch,
        };
        let err = import_products(&mut doc, &ctx, &RequestInput::new(), ImportMode::Merge).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
