//! Demo catalogue every new session starts from.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use super::{NextIds, StoreDocument};
use crate::models::{
    Category, Order, OrderItem, OrderStatus, PaymentSettings, Product, ShippingRate,
    ShippingSettings, ShippingZone, WeightRange,
};

pub fn document() -> StoreDocument {
    let products = products();
    let orders = orders(&products);
    let next_ids = NextIds {
        products: products.len() as i64 + 1,
        categories: 3,
        orders: orders.len() as i64 + 1,
        ..NextIds::default()
    };

    StoreDocument {
        products,
        categories: categories(),
        orders,
        users: Vec::new(),
        blog_posts: Vec::new(),
        gallery: Vec::new(),
        announcements: Vec::new(),
        payment_settings: payment_settings(),
        shipping_settings: shipping_settings(),
        next_ids,
    }
}

fn categories() -> Vec<Category> {
    let now = Utc::now();
    vec![
        Category {
            id: 1,
            slug: "hot-sauce".to_string(),
            name: "Hot Sauce".to_string(),
            description: "Scharfe Saucen aus aller Welt".to_string(),
            created_at: now,
        },
        Category {
            id: 2,
            slug: "outdoor".to_string(),
            name: "Outdoor".to_string(),
            description: "Ausrüstung für draussen".to_string(),
            created_at: now,
        },
    ]
}

struct SeedProduct {
    name: &'static str,
    description: &'static str,
    price_cents: i64,
    stock: i64,
    category: &'static str,
    image: &'static str,
    heat_level: Option<u8>,
    rating: f64,
    badge: &'static str,
    origin: &'static str,
    supplier: &'static str,
    weight_kg: f64,
}

const SEED_PRODUCTS: [SeedProduct; 6] = [
    SeedProduct {
        name: "Habanero Gold",
        description: "Fruchtige Habanero-Sauce mit Mango und Limette.",
        price_cents: 1290,
        stock: 24,
        category: "hot-sauce",
        image: "habanero-gold.jpg",
        heat_level: Some(4),
        rating: 4.7,
        badge: "Bestseller",
        origin: "Mexiko",
        supplier: "Salsa Fuego",
        weight_kg: 0.25,
    },
    SeedProduct {
        name: "Smoky Chipotle",
        description: "Rauchige Chipotle-Sauce für Grill und Burger.",
        price_cents: 990,
        stock: 8,
        category: "hot-sauce",
        image: "smoky-chipotle",
        heat_level: Some(2),
        rating: 4.4,
        badge: "",
        origin: "USA",
        supplier: "Smokehouse Co.",
        weight_kg: 0.25,
    },
    SeedProduct {
        name: "Carolina Reaper Inferno",
        description: "Nur für Mutige: Extrakt aus Carolina Reaper.",
        price_cents: 1890,
        stock: 0,
        category: "hot-sauce",
        image: "reaper-inferno.png",
        heat_level: Some(5),
        rating: 4.9,
        badge: "Extrem",
        origin: "USA",
        supplier: "PuckerButt",
        weight_kg: 0.15,
    },
    SeedProduct {
        name: "Swiss Alpine Chili",
        description: "Milde Chilisauce mit Alpenkräutern aus dem Emmental.",
        price_cents: 1150,
        stock: 40,
        category: "hot-sauce",
        image: "alpine-chili",
        heat_level: Some(1),
        rating: 4.2,
        badge: "Neu",
        origin: "Schweiz",
        supplier: "Bergküche AG",
        weight_kg: 0.2,
    },
    SeedProduct {
        name: "Trekking-Messer Ranger",
        description: "Robustes Klappmesser mit Feuerstahl.",
        price_cents: 4990,
        stock: 3,
        category: "outdoor",
        image: "https://assets.hot-sauce-shop.ch/images/ranger-knife.webp",
        heat_level: None,
        rating: 4.6,
        badge: "",
        origin: "Schweiz",
        supplier: "Victorinox",
        weight_kg: 0.12,
    },
    SeedProduct {
        name: "Biwaksack Ultralight",
        description: "Wasserdichter Notfallbiwak, 180 g.",
        price_cents: 7900,
        stock: 15,
        category: "outdoor",
        image: "biwaksack",
        heat_level: None,
        rating: 4.3,
        badge: "",
        origin: "Deutschland",
        supplier: "Outdoor Supply GmbH",
        weight_kg: 0.18,
    },
];

fn products() -> Vec<Product> {
    let now = Utc::now();
    SEED_PRODUCTS
        .iter()
        .zip(1_i64..)
        .map(|(seed, id)| Product {
            id,
            name: seed.name.to_string(),
            description: seed.description.to_string(),
            price: Decimal::new(seed.price_cents, 2),
            stock: seed.stock,
            category: seed.category.to_string(),
            image: Some(seed.image.to_string()),
            image_2: None,
            image_3: None,
            image_4: None,
            heat_level: seed.heat_level,
            rating: seed.rating,
            badge: seed.badge.to_string(),
            origin: seed.origin.to_string(),
            supplier: seed.supplier.to_string(),
            weight_kg: Some(seed.weight_kg),
            created_at: now,
            updated_at: now,
            stock_status: None,
            image_url: None,
            image_url_candidates: None,
        })
        .collect()
}

fn order_item(product: &Product, quantity: i64) -> OrderItem {
    OrderItem {
        product_id: product.id,
        product_name: product.name.clone(),
        product_description: product.description.clone(),
        product_image: product.image.clone(),
        quantity,
        unit_price: product.price,
        subtotal: product.price * Decimal::from(quantity),
    }
}

fn orders(products: &[Product]) -> Vec<Order> {
    let now = Utc::now();
    let shipping = Decimal::new(900, 2);

    let first_items: Vec<OrderItem> = products
        .iter()
        .take(2)
        .map(|product| order_item(product, 2))
        .collect();
    let second_items: Vec<OrderItem> = products
        .iter()
        .skip(4)
        .take(1)
        .map(|product| order_item(product, 1))
        .collect();

    let total = |items: &[OrderItem]| items.iter().map(|item| item.subtotal).sum::<Decimal>() + shipping;
    let first_created = now - Duration::days(3);
    let second_created = now - Duration::days(1);

    vec![
        Order {
            id: 1,
            order_number: format!("ORD-{:X}-1", first_created.timestamp_millis()),
            customer_name: "Anna Muster".to_string(),
            customer_email: "anna.muster@example.ch".to_string(),
            customer_phone: "+41 79 123 45 67".to_string(),
            customer_address: "Bahnhofstrasse 1".to_string(),
            customer_city: "Zürich".to_string(),
            customer_postal_code: "8001".to_string(),
            customer_canton: "ZH".to_string(),
            notes: String::new(),
            total_amount: total(&first_items),
            shipping_cost: shipping,
            status: OrderStatus::Completed,
            payment_method: "invoice".to_string(),
            payment_status: "paid".to_string(),
            created_at: first_created,
            updated_at: first_created,
            items: first_items,
        },
        Order {
            id: 2,
            order_number: format!("ORD-{:X}-2", second_created.timestamp_millis()),
            customer_name: "Luca Bernasconi".to_string(),
            customer_email: "luca.b@example.ch".to_string(),
            customer_phone: "+41 91 555 12 34".to_string(),
            customer_address: "Via Nassa 12".to_string(),
            customer_city: "Lugano".to_string(),
            customer_postal_code: "6900".to_string(),
            customer_canton: "TI".to_string(),
            notes: "Bitte beim Nachbarn abgeben".to_string(),
            total_amount: total(&second_items),
            shipping_cost: shipping,
            status: OrderStatus::Pending,
            payment_method: "invoice".to_string(),
            payment_status: "pending".to_string(),
            created_at: second_created,
            updated_at: second_created,
            items: second_items,
        },
    ]
}

pub fn payment_settings() -> PaymentSettings {
    PaymentSettings {
        invoice_enabled: true,
        bank_transfer_enabled: false,
        twint_enabled: false,
        stripe_enabled: false,
        paypal_enabled: false,
        bank_name: "PostFinance AG".to_string(),
        account_holder: "Hot Sauce Shop GmbH".to_string(),
        iban: "CH93 0076 2011 6238 5295 7".to_string(),
        bic: "POFICHBEXXX".to_string(),
    }
}

const EUROPE: [&str; 30] = [
    "AT", "BE", "BG", "CY", "CZ", "DE", "DK", "EE", "ES", "FI", "FR", "GB", "GR", "HR", "HU",
    "IE", "IS", "IT", "LT", "LU", "LV", "MC", "MT", "NL", "NO", "PL", "PT", "RO", "SE", "SI",
];

/// Weight brackets in kg, upper bound inclusive.
const BRACKETS: [(f64, f64); 6] = [
    (0.0, 0.5),
    (0.5, 1.0),
    (1.0, 2.0),
    (2.0, 5.0),
    (5.0, 10.0),
    (10.0, 30.0),
];

/// Rates in centimes per zone, one entry per bracket.
const RATES: [[i64; 6]; 3] = [
    [700, 900, 1050, 1200, 1500, 2300],
    [1700, 2200, 2800, 3800, 5200, 8500],
    [2500, 3300, 4500, 6200, 8800, 14000],
];

pub fn shipping_settings() -> ShippingSettings {
    let zones = vec![
        ShippingZone {
            id: 1,
            name: "Schweiz".to_string(),
            countries: vec!["CH".to_string(), "LI".to_string()],
        },
        ShippingZone {
            id: 2,
            name: "Europa".to_string(),
            countries: EUROPE.iter().map(|code| code.to_string()).collect(),
        },
        ShippingZone {
            id: 3,
            name: "International".to_string(),
            countries: Vec::new(),
        },
    ];

    let weight_ranges = BRACKETS
        .iter()
        .zip(1_i64..)
        .map(|(&(min_kg, max_kg), id)| WeightRange { id, min_kg, max_kg })
        .collect();

    let rates = RATES
        .iter()
        .zip(1_i64..)
        .flat_map(|(row, zone_id)| {
            row.iter().zip(1_i64..).map(move |(&cents, range_id)| ShippingRate {
                zone_id,
                range_id,
                price: Decimal::new(cents, 2),
            })
        })
        .collect();

    ShippingSettings {
        zones,
        weight_ranges,
        rates,
        free_shipping_threshold: Some(Decimal::new(10000, 2)),
    }
}
