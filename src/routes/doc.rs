use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{categories, content, orders, products, settings, users},
    models::{
        Announcement, BlogPost, Category, GalleryImage, Order, OrderItem, OrderStatus,
        PaymentSettings, Product, ShippingRate, ShippingSettings, ShippingZone, StockStatus,
        UserProfile, WeightRange,
    },
    response::{ErrorBody, Meta},
    routes::{demo, health},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("opaque")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health::health_check, demo::handle),
    components(
        schemas(
            Product,
            StockStatus,
            Category,
            Order,
            OrderItem,
            OrderStatus,
            UserProfile,
            BlogPost,
            GalleryImage,
            Announcement,
            PaymentSettings,
            ShippingSettings,
            ShippingZone,
            WeightRange,
            ShippingRate,
            Meta,
            ErrorBody,
            health::HealthData,
            products::ProductList,
            products::ProductStats,
            products::ImportSummary,
            categories::CategoryList,
            categories::CategoryDeleted,
            orders::OrderList,
            orders::OrderStats,
            orders::OrderCreated,
            users::AuthData,
            content::BlogPostList,
            content::GalleryList,
            content::AnnouncementList,
            settings::ShippingQuote
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Demo", description = "Session-scoped demo store, legacy endpoint names"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
