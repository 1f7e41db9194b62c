use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Category;

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: Category,
    pub product_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryList {
    pub categories: Vec<CategoryWithCount>,
    pub total: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryData {
    pub category: Category,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryDeleted {
    pub id: i64,
    pub slug: String,
    /// Products still pointing at the removed slug.
    pub orphaned_products: usize,
}
