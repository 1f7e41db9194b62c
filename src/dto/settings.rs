use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{PaymentSettings, ShippingSettings};

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentSettingsData {
    pub settings: PaymentSettings,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShippingSettingsData {
    pub settings: ShippingSettings,
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct ShippingQuote {
    pub zone: String,
    pub weight_kg: f64,
    #[schema(value_type = f64)]
    pub shipping_cost: Decimal,
    pub free_shipping: bool,
}
