use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Product;

#[derive(Debug, Serialize, ToSchema, Default, PartialEq, Eq)]
pub struct ProductStats {
    pub total: usize,
    pub in_stock: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
    pub by_category: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub products: Vec<Product>,
    pub total: usize,
    pub stats: ProductStats,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductData {
    pub product: Product,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedRecord {
    pub id: i64,
}

/// Outcome of a spreadsheet import.
#[derive(Debug, Serialize, ToSchema, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub categories_created: usize,
    pub total: usize,
}
