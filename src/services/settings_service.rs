//! Payment switches, shipping tables and the shipping calculator.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::{
    audit::log_audit,
    dto::settings::{PaymentSettingsData, ShippingQuote, ShippingSettingsData},
    error::{AppError, AppResult},
    models::{ShippingRate, ShippingSettings, ShippingZone, WeightRange},
    response::ApiResponse,
    routes::params::{RequestInput, parse_decimal},
    services::RequestContext,
    store::StoreDocument,
};

pub const DEFAULT_COUNTRY: &str = "CH";

pub fn get_payment_settings(doc: &StoreDocument) -> AppResult<ApiResponse<PaymentSettingsData>> {
    Ok(ApiResponse::data(PaymentSettingsData {
        settings: doc.payment_settings.clone(),
    }))
}

pub fn update_payment_settings(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<PaymentSettingsData>> {
    let settings = &mut doc.payment_settings;
    for (key, flag) in [
        ("invoice_enabled", &mut settings.invoice_enabled),
        ("bank_transfer_enabled", &mut settings.bank_transfer_enabled),
        ("twint_enabled", &mut settings.twint_enabled),
        ("stripe_enabled", &mut settings.stripe_enabled),
        ("paypal_enabled", &mut settings.paypal_enabled),
    ] {
        if let Some(value) = input.opt_flag(key) {
            *flag = value;
        }
    }
    for (key, text) in [
        ("bank_name", &mut settings.bank_name),
        ("account_holder", &mut settings.account_holder),
        ("iban", &mut settings.iban),
        ("bic", &mut settings.bic),
    ] {
        if let Some(value) = input.raw_text(key) {
            *text = value.trim().to_string();
        }
    }

    log_audit(ctx.session, "payment_settings_update", "settings", None);
    Ok(ApiResponse::success(
        "Payment settings saved",
        PaymentSettingsData {
            settings: settings.clone(),
        },
    ))
}

pub fn get_shipping_settings(doc: &StoreDocument) -> AppResult<ApiResponse<ShippingSettingsData>> {
    Ok(ApiResponse::data(ShippingSettingsData {
        settings: doc.shipping_settings.clone(),
    }))
}

fn decode_list<T: serde::de::DeserializeOwned>(value: Value, what: &str) -> AppResult<Vec<T>> {
    serde_json::from_value(value)
        .map_err(|err| AppError::BadRequest(format!("Invalid {what}: {err}")))
}

fn validate(settings: &ShippingSettings) -> AppResult<()> {
    let zone_ids: HashSet<i64> = settings.zones.iter().map(|z| z.id).collect();
    let range_ids: HashSet<i64> = settings.weight_ranges.iter().map(|r| r.id).collect();
    if zone_ids.len() != settings.zones.len() {
        return Err(AppError::BadRequest("Duplicate shipping zone id".into()));
    }
    if range_ids.len() != settings.weight_ranges.len() {
        return Err(AppError::BadRequest("Duplicate weight range id".into()));
    }
    if let Some(range) = settings
        .weight_ranges
        .iter()
        .find(|r| r.min_kg < 0.0 || r.max_kg < r.min_kg)
    {
        return Err(AppError::BadRequest(format!(
            "Weight range {} has invalid bounds",
            range.id
        )));
    }
    for rate in &settings.rates {
        if !zone_ids.contains(&rate.zone_id) || !range_ids.contains(&rate.range_id) {
            return Err(AppError::BadRequest(format!(
                "Rate references unknown zone {} or weight range {}",
                rate.zone_id, rate.range_id
            )));
        }
        if rate.price.is_sign_negative() {
            return Err(AppError::BadRequest("Shipping rates cannot be negative".into()));
        }
    }
    Ok(())
}

/// Replaces whichever of zones, weight ranges and rates the request carries.
pub fn update_shipping_settings(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<ShippingSettingsData>> {
    let mut settings = doc.shipping_settings.clone();

    if let Some(zones) = input.json("zones") {
        let mut zones: Vec<ShippingZone> = decode_list(zones, "zones")?;
        for zone in &mut zones {
            zone.countries = zone
                .countries
                .iter()
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty())
                .collect();
        }
        settings.zones = zones;
    }
    if let Some(ranges) = input.json("weight_ranges") {
        settings.weight_ranges = decode_list::<WeightRange>(ranges, "weight ranges")?;
    }
    if let Some(rates) = input.json("rates") {
        settings.rates = decode_list::<ShippingRate>(rates, "rates")?;
    }
    if let Some(raw) = input.raw_text("free_shipping_threshold") {
        settings.free_shipping_threshold = if raw.trim().is_empty() {
            None
        } else {
            Some(parse_decimal(&raw).ok_or_else(|| {
                AppError::BadRequest("Invalid free shipping threshold".into())
            })?)
        };
    }
    validate(&settings)?;
    doc.shipping_settings = settings.clone();

    log_audit(ctx.session, "shipping_settings_update", "settings", None);
    Ok(ApiResponse::success(
        "Shipping settings saved",
        ShippingSettingsData { settings },
    ))
}

/// Zone for `country`: an explicit listing wins over the catch-all zone.
fn zone_for<'s>(settings: &'s ShippingSettings, country: &str) -> Option<&'s ShippingZone> {
    settings
        .zones
        .iter()
        .find(|z| z.countries.iter().any(|c| c.eq_ignore_ascii_case(country)))
        .or_else(|| settings.zones.iter().find(|z| z.countries.is_empty()))
}

/// Smallest bracket whose upper bound holds `weight_kg`.
fn range_for(settings: &ShippingSettings, weight_kg: f64) -> Option<&WeightRange> {
    let mut ranges: Vec<&WeightRange> = settings.weight_ranges.iter().collect();
    ranges.sort_by(|a, b| a.max_kg.total_cmp(&b.max_kg));
    ranges.into_iter().find(|r| weight_kg <= r.max_kg)
}

pub fn quote(
    settings: &ShippingSettings,
    country: &str,
    weight_kg: f64,
    subtotal: Option<Decimal>,
) -> AppResult<ShippingQuote> {
    let zone = zone_for(settings, country)
        .ok_or_else(|| AppError::BadRequest(format!("No shipping zone covers {country}")))?;

    let free = matches!(
        (subtotal, settings.free_shipping_threshold),
        (Some(subtotal), Some(threshold)) if subtotal >= threshold
    );
    if free {
        return Ok(ShippingQuote {
            zone: zone.name.clone(),
            weight_kg,
            shipping_cost: Decimal::ZERO,
            free_shipping: true,
        });
    }

    let range = range_for(settings, weight_kg).ok_or_else(|| {
        AppError::BadRequest(format!("No shipping rate for a {weight_kg} kg parcel"))
    })?;
    let rate = settings
        .rates
        .iter()
        .find(|r| r.zone_id == zone.id && r.range_id == range.id)
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "No shipping rate configured for {} up to {} kg",
                zone.name, range.max_kg
            ))
        })?;

    Ok(ShippingQuote {
        zone: zone.name.clone(),
        weight_kg,
        shipping_cost: rate.price,
        free_shipping: false,
    })
}

pub fn calculate_shipping(
    doc: &StoreDocument,
    input: &RequestInput,
) -> AppResult<ApiResponse<ShippingQuote>> {
    let country = input
        .text("country")
        .map(|c| c.to_uppercase())
        .unwrap_or_else(|| DEFAULT_COUNTRY.to_string());
    let weight_kg = input.f64("weight_kg").or_else(|| input.f64("weight")).unwrap_or(0.0);
    if weight_kg < 0.0 {
        return Err(AppError::BadRequest("Weight cannot be negative".into()));
    }
    let subtotal = input.decimal("subtotal");

    quote(&doc.shipping_settings, &country, weight_kg, subtotal).map(ApiResponse::data)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::seed;

    fn chf(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn swiss_parcel_uses_matching_bracket() {
        let settings = seed::shipping_settings();
        let q = quote(&settings, "CH", 0.8, None).unwrap();
        assert_eq!(q.zone, "Schweiz");
        assert_eq!(q.shipping_cost, chf(900));
        assert!(!q.free_shipping);

        // upper bound is inclusive
        assert_eq!(quote(&settings, "CH", 0.5, None).unwrap().shipping_cost, chf(700));
    }

    #[test]
    fn unknown_country_falls_back_to_catch_all() {
        let settings = seed::shipping_settings();
        let q = quote(&settings, "JP", 3.0, None).unwrap();
        assert_eq!(q.zone, "International");
        assert_eq!(q.shipping_cost, chf(6200));
    }

    #[test]
    fn threshold_makes_shipping_free() {
        let settings = seed::shipping_settings();
        let q = quote(&settings, "DE", 1.5, Some(chf(10000))).unwrap();
        assert!(q.free_shipping);
        assert_eq!(q.shipping_cost, Decimal::ZERO);

        let q = quote(&settings, "DE", 1.5, Some(chf(9990))).unwrap();
        assert_eq!(q.shipping_cost, chf(2800));
    }

    #[test]
    fn overweight_parcel_is_rejected() {
        let settings = seed::shipping_settings();
        assert!(matches!(
            quote(&settings, "CH", 31.0, None),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn calculator_defaults_to_switzerland() {
        let doc = seed::document();
        let resp = calculate_shipping(&doc, &RequestInput::from_json(json!({"weight_kg": "1,5"})));
        assert_eq!(resp.unwrap().data.zone, "Schweiz");
    }

    #[test]
    fn dangling_rate_is_rejected() {
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
        let input = RequestInput::from_json(json!({
            "rates": [{"zone_id": 9, "range_id": 1, "price": 5.0}]
        }));
        assert!(update_shipping_settings(&mut doc, &ctx, &input).is_err());
        assert_eq!(doc.shipping_settings, seed::shipping_settings());

        let input = RequestInput::from_json(json!({"free_shipping_threshold": ""}));
        update_shipping_settings(&mut doc, &ctx, &input).unwrap();
        assert_eq!(doc.shipping_settings.free_shipping_threshold, None);
    }
}
