use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{models::Order, response::Meta};

#[derive(Debug, Serialize, ToSchema, Default)]
pub struct OrderStats {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub cancelled: usize,
    #[schema(value_type = f64)]
    pub revenue: Decimal,
}

/// Paged orders. The paging numbers appear both in `pagination` and at the
/// top level because the admin and account pages read different ones.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub orders: Vec<Order>,
    pub pagination: Meta,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
    pub stats: OrderStats,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderData {
    pub order: Order,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderCreated {
    pub order: Order,
    pub order_id: i64,
    pub order_number: String,
}
