use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::{
    audit::log_audit,
    dto::{
        orders::{OrderCreated, OrderData, OrderList, OrderStats},
        products::DeletedRecord,
    },
    error::{AppError, AppResult},
    models::{Order, OrderItem, OrderStatus},
    response::{ApiResponse, Meta},
    routes::params::{Pagination, RequestInput, parse_decimal, parse_int},
    services::{RequestContext, require_id},
    store::{EntityKind, StoreDocument},
};

pub fn list_orders(
    doc: &StoreDocument,
    input: &RequestInput,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = Pagination::from_input(input).normalize();
    let status = input.text("status").map(|s| s.to_lowercase());
    let email = input.text("email").map(|s| s.to_lowercase());
    let search = input.text("search").map(|s| s.to_lowercase());

    let mut matching: Vec<&Order> = doc
        .orders
        .iter()
        .filter(|o| status.as_ref().is_none_or(|s| o.status.as_str() == s.as_str()))
        .filter(|o| {
            email
                .as_ref()
                .is_none_or(|e| o.customer_email.to_lowercase() == *e)
        })
        .filter(|o| search.as_ref().is_none_or(|needle| order_matches(o, needle)))
        .collect();
    matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

    let total = matching.len() as i64;
    let orders: Vec<Order> = matching
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .cloned()
        .collect();

    let pagination = Meta::new(page, limit, total);
    Ok(ApiResponse::data(OrderList {
        orders,
        total,
        page,
        limit,
        total_pages: pagination.total_pages,
        pagination,
        stats: order_stats(&doc.orders),
    }))
}

fn order_matches(order: &Order, needle: &str) -> bool {
    [
        &order.order_number,
        &order.customer_name,
        &order.customer_email,
        &order.customer_phone,
        &order.customer_address,
        &order.customer_city,
        &order.customer_postal_code,
        &order.customer_canton,
        &order.notes,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}

fn order_stats(orders: &[Order]) -> OrderStats {
    let mut stats = OrderStats::default();
    for order in orders {
        match order.status {
            OrderStatus::Pending => stats.pending += 1,
            OrderStatus::Processing => stats.processing += 1,
            OrderStatus::Completed => stats.completed += 1,
            OrderStatus::Cancelled => stats.cancelled += 1,
        }
        if order.status != OrderStatus::Cancelled {
            stats.revenue += order.total_amount;
        }
    }
    stats
}

pub fn get_order(doc: &StoreDocument, input: &RequestInput) -> AppResult<ApiResponse<OrderData>> {
    let order = match (input.i64("id"), input.text("order_number")) {
        (Some(id), _) => doc.orders.iter().find(|o| o.id == id),
        (None, Some(number)) => doc
            .orders
            .iter()
            .find(|o| o.order_number.eq_ignore_ascii_case(&number)),
        (None, None) => return Err(AppError::BadRequest("Missing id or order_number".into())),
    };
    let order = order
        .cloned()
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;
    Ok(ApiResponse::data(OrderData { order }))
}

fn item_text(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match item.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Builds the item snapshot from the submitted cart line, falling back to the
/// catalogue for anything the cart did not carry.
fn snapshot_item(doc: &StoreDocument, line: &Value) -> AppResult<OrderItem> {
    let product_id = item_text(line, &["product_id", "id"])
        .as_deref()
        .and_then(parse_int)
        .unwrap_or(0);
    let product = doc.products.iter().find(|p| p.id == product_id);

    let quantity = item_text(line, &["quantity", "qty"])
        .as_deref()
        .and_then(parse_int)
        .unwrap_or(1);
    if quantity <= 0 {
        return Err(AppError::BadRequest(format!(
            "Invalid quantity for product {product_id}"
        )));
    }

    let product_name = item_text(line, &["name", "product_name"])
        .or_else(|| product.map(|p| p.name.clone()))
        .ok_or_else(|| AppError::BadRequest("Order item without product name".into()))?;
    let unit_price = item_text(line, &["price", "unit_price"])
        .as_deref()
        .and_then(parse_decimal)
        .or_else(|| product.map(|p| p.price))
        .ok_or_else(|| AppError::BadRequest(format!("Order item `{product_name}` has no price")))?
        .max(Decimal::ZERO);

    Ok(OrderItem {
        product_id,
        product_description: item_text(line, &["description", "product_description"])
            .or_else(|| product.map(|p| p.description.clone()))
            .unwrap_or_default(),
        product_image: item_text(line, &["image", "image_url", "product_image"])
            .or_else(|| product.and_then(|p| p.image.clone())),
        quantity,
        unit_price,
        subtotal: unit_price * Decimal::from(quantity),
        product_name,
    })
}

fn customer_name(input: &RequestInput) -> Option<String> {
    input
        .text("customer_name")
        .or_else(|| input.text("name"))
        .or_else(|| {
            let full = format!(
                "{} {}",
                input.text_or_default("first_name"),
                input.text_or_default("last_name")
            );
            let full = full.trim();
            (!full.is_empty()).then(|| full.to_string())
        })
}

fn customer_field(input: &RequestInput, key: &str) -> String {
    input
        .raw_text(&format!("customer_{key}"))
        .or_else(|| input.raw_text(key))
        .unwrap_or_default()
}

pub fn create_order(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<OrderCreated>> {
    let customer_name =
        customer_name(input).ok_or_else(|| AppError::BadRequest("Customer name is required".into()))?;
    let customer_email = input
        .text("customer_email")
        .or_else(|| input.text("email"))
        .filter(|email| email.contains('@'))
        .ok_or_else(|| AppError::BadRequest("A valid customer email is required".into()))?;

    let lines = match input.json("items").or_else(|| input.json("cart")) {
        Some(Value::Array(lines)) if !lines.is_empty() => lines,
        _ => {
            return Err(AppError::BadRequest(
                "Order must contain at least one item".into(),
            ));
        }
    };
    let items = lines
        .iter()
        .map(|line| snapshot_item(&*doc, line))
        .collect::<AppResult<Vec<_>>>()?;

    let shipping_cost = input
        .decimal("shipping_cost")
        .unwrap_or(Decimal::ZERO)
        .max(Decimal::ZERO);
    let total_amount = items.iter().map(|i| i.subtotal).sum::<Decimal>() + shipping_cost;

    for item in &items {
        if let Some(product) = doc.products.iter_mut().find(|p| p.id == item.product_id) {
            product.stock = (product.stock - item.quantity).max(0);
        }
    }

    let now = Utc::now();
    let id = doc.next_id(EntityKind::Order);
    let order = Order {
        id,
        order_number: format!("ORD-{:X}-{}", now.timestamp_millis(), id),
        customer_name,
        customer_email,
        customer_phone: customer_field(input, "phone"),
        customer_address: customer_field(input, "address"),
        customer_city: customer_field(input, "city"),
        customer_postal_code: customer_field(input, "postal_code"),
        customer_canton: customer_field(input, "canton"),
        notes: input.text_or_default("notes"),
        total_amount,
        shipping_cost,
        status: OrderStatus::Pending,
        payment_method: input
            .text("payment_method")
            .unwrap_or_else(|| "invoice".to_string()),
        payment_status: input
            .text("payment_status")
            .unwrap_or_else(|| "pending".to_string()),
        created_at: now,
        updated_at: now,
        items,
    };
    doc.orders.push(order.clone());

    log_audit(
        ctx.session,
        "order_create",
        "orders",
        Some(serde_json::json!({ "order_id": order.id, "total": order.total_amount.to_string() })),
    );

    Ok(ApiResponse::success(
        "Order created",
        OrderCreated {
            order_id: order.id,
            order_number: order.order_number.clone(),
            order,
        },
    )
    .created())
}

/// Any status may follow any other; only unknown values are refused.
pub fn update_order_status(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<OrderData>> {
    let id = require_id(input, "id")?;
    let status = input
        .text("status")
        .ok_or_else(|| AppError::BadRequest("Missing status".into()))?;
    let status = OrderStatus::parse(&status).ok_or_else(|| {
        let allowed: Vec<&str> = OrderStatus::ALL.iter().map(OrderStatus::as_str).collect();
        AppError::BadRequest(format!(
            "Invalid status `{status}` (allowed: {})",
            allowed.join(", ")
        ))
    })?;

    let order = doc
        .orders
        .iter_mut()
        .find(|o| o.id == id)
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;
    let previous = order.status;
    order.status = status;
    if let Some(payment_status) = input.text("payment_status") {
        order.payment_status = payment_status;
    }
    order.updated_at = Utc::now();
    let order = order.clone();

    log_audit(
        ctx.session,
        "order_status_update",
        "orders",
        Some(serde_json::json!({
            "order_id": id,
            "from": previous.as_str(),
            "to": status.as_str(),
        })),
    );

    Ok(ApiResponse::success("Order status updated", OrderData { order }))
}

pub fn delete_order(
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<ApiResponse<DeletedRecord>> {
    let id = require_id(input, "id")?;
    let before = doc.orders.len();
    doc.orders.retain(|o| o.id != id);
    if doc.orders.len() == before {
        return Err(AppError::NotFound("Order not found".into()));
    }

    log_audit(
        ctx.session,
        "order_delete",
        "orders",
        Some(serde_json::json!({ "order_id": id })),
    );
    Ok(ApiResponse::success("Order deleted", DeletedRecord { id }))
}
