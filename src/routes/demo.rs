//! The legacy `/api/demo/<name>.php` surface.
//!
//! Every request loads the caller's session document, runs one service
//! operation against it and, for write endpoints that succeed, saves it back.
//! Uploaded files follow the document: they are kept only when it is saved.

use axum::{
    extract::{Path, State},
    http::Method,
    response::{IntoResponse, Response},
};

use crate::{
    error::{AppError, AppResult},
    response::ErrorBody,
    routes::params::RequestInput,
    services::{
        RequestContext, category_service, content_service,
        import_service::{self, ImportMode},
        order_service, product_service, settings_service, user_service,
    },
    session::SessionToken,
    state::AppState,
    store::StoreDocument,
    uploads::UploadBatch,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    GetProducts,
    GetProduct,
    AddProduct,
    EditProduct,
    DeleteProduct,
    GetCategories,
    AddCategory,
    EditCategory,
    DeleteCategory,
    GetOrders,
    GetOrder,
    AddOrder,
    UpdateOrderStatus,
    DeleteOrder,
    Register,
    Login,
    Logout,
    GetUser,
    UpdateUser,
    ChangePassword,
    DeleteUser,
    GetBlogPosts,
    AddBlogPost,
    EditBlogPost,
    DeleteBlogPost,
    GetGallery,
    AddGalleryImage,
    DeleteGalleryImage,
    GetAnnouncements,
    AddAnnouncement,
    EditAnnouncement,
    DeleteAnnouncement,
    GetPaymentSettings,
    UpdatePaymentSettings,
    GetShippingSettings,
    UpdateShippingSettings,
    CalculateShipping,
    ImportProducts,
    ImportProductsAdd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET | Method::HEAD => Some(Verb::Get),
            Method::POST => Some(Verb::Post),
            Method::PUT => Some(Verb::Put),
            Method::DELETE => Some(Verb::Delete),
            _ => None,
        }
    }
}

const READ: &[Verb] = &[Verb::Get];
const CREATE: &[Verb] = &[Verb::Post];
const UPDATE: &[Verb] = &[Verb::Post, Verb::Put];
const REMOVE: &[Verb] = &[Verb::Post, Verb::Delete];

/// Name (without `.php`), endpoint, access, accepted verbs.
const ENDPOINTS: &[(&str, Endpoint, Access, &[Verb])] = &[
    ("get_products", Endpoint::GetProducts, Access::Read, READ),
    ("get_product", Endpoint::GetProduct, Access::Read, READ),
    ("add_product", Endpoint::AddProduct, Access::Write, CREATE),
    ("edit_product", Endpoint::EditProduct, Access::Write, UPDATE),
    ("delete_product", Endpoint::DeleteProduct, Access::Write, REMOVE),
    ("get_categories", Endpoint::GetCategories, Access::Read, READ),
    ("add_category", Endpoint::AddCategory, Access::Write, CREATE),
    ("edit_category", Endpoint::EditCategory, Access::Write, UPDATE),
    ("delete_category", Endpoint::DeleteCategory, Access::Write, REMOVE),
    ("get_orders", Endpoint::GetOrders, Access::Read, READ),
    ("get_order", Endpoint::GetOrder, Access::Read, READ),
    ("add_order", Endpoint::AddOrder, Access::Write, CREATE),
    ("update_order_status", Endpoint::UpdateOrderStatus, Access::Write, UPDATE),
    ("delete_order", Endpoint::DeleteOrder, Access::Write, REMOVE),
    ("register", Endpoint::Register, Access::Write, CREATE),
    ("login", Endpoint::Login, Access::Write, CREATE),
    ("logout", Endpoint::Logout, Access::Write, CREATE),
    ("get_user", Endpoint::GetUser, Access::Read, READ),
    ("update_user", Endpoint::UpdateUser, Access::Write, UPDATE),
    ("change_password", Endpoint::ChangePassword, Access::Write, CREATE),
    ("delete_user", Endpoint::DeleteUser, Access::Write, REMOVE),
    ("get_blog_posts", Endpoint::GetBlogPosts, Access::Read, READ),
    ("add_blog_post", Endpoint::AddBlogPost, Access::Write, CREATE),
    ("edit_blog_post", Endpoint::EditBlogPost, Access::Write, UPDATE),
    ("delete_blog_post", Endpoint::DeleteBlogPost, Access::Write, REMOVE),
    ("get_gallery", Endpoint::GetGallery, Access::Read, READ),
    ("add_gallery_image", Endpoint::AddGalleryImage, Access::Write, CREATE),
    ("delete_gallery_image", Endpoint::DeleteGalleryImage, Access::Write, REMOVE),
    ("get_announcements", Endpoint::GetAnnouncements, Access::Read, READ),
    ("add_announcement", Endpoint::AddAnnouncement, Access::Write, CREATE),
    ("edit_announcement", Endpoint::EditAnnouncement, Access::Write, UPDATE),
    ("delete_announcement", Endpoint::DeleteAnnouncement, Access::Write, REMOVE),
    ("get_payment_settings", Endpoint::GetPaymentSettings, Access::Read, READ),
    ("update_payment_settings", Endpoint::UpdatePaymentSettings, Access::Write, UPDATE),
    ("get_shipping_settings", Endpoint::GetShippingSettings, Access::Read, READ),
    ("update_shipping_settings", Endpoint::UpdateShippingSettings, Access::Write, UPDATE),
    ("calculate_shipping", Endpoint::CalculateShipping, Access::Read, &[Verb::Get, Verb::Post]),
    ("import_products", Endpoint::ImportProducts, Access::Write, CREATE),
    ("import_products_add", Endpoint::ImportProductsAdd, Access::Write, CREATE),
];

#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub endpoint: Endpoint,
    pub access: Access,
    verbs: &'static [Verb],
}

impl Route {
    /// Looks up `name`, with or without the `.php` suffix.
    pub fn lookup(name: &str) -> Option<Self> {
        let name = name.strip_suffix(".php").unwrap_or(name);
        ENDPOINTS
            .iter()
            .find(|(n, ..)| *n == name)
            .map(|&(_, endpoint, access, verbs)| Route {
                endpoint,
                access,
                verbs,
            })
    }

    pub fn allows(&self, method: &Method) -> bool {
        Verb::from_method(method).is_some_and(|verb| self.verbs.contains(&verb))
    }
}

async fn dispatch(
    endpoint: Endpoint,
    doc: &mut StoreDocument,
    ctx: &RequestContext<'_>,
    input: &RequestInput,
) -> AppResult<Response> {
    use Endpoint::*;

    let response = match endpoint {
        GetProducts => product_service::list_products(doc, ctx, input)?.into_response(),
        GetProduct => product_service::get_product(doc, ctx, input)?.into_response(),
        AddProduct => product_service::create_product(doc, ctx, input).await?.into_response(),
        EditProduct => product_service::update_product(doc, ctx, input).await?.into_response(),
        DeleteProduct => product_service::delete_product(doc, ctx, input).await?.into_response(),

        GetCategories => category_service::list_categories(doc)?.into_response(),
        AddCategory => category_service::create_category(doc, ctx, input)?.into_response(),
        EditCategory => category_service::update_category(doc, ctx, input)?.into_response(),
        DeleteCategory => category_service::delete_category(doc, ctx, input)?.into_response(),

        GetOrders => order_service::list_orders(doc, input)?.into_response(),
        GetOrder => order_service::get_order(doc, input)?.into_response(),
        AddOrder => order_service::create_order(doc, ctx, input)?.into_response(),
        UpdateOrderStatus => order_service::update_order_status(doc, ctx, input)?.into_response(),
        DeleteOrder => order_service::delete_order(doc, ctx, input)?.into_response(),

        Register => user_service::register(doc, ctx, input)?.into_response(),
        Login => user_service::login(doc, ctx, input)?.into_response(),
        Logout => user_service::logout(doc, input)?.into_response(),
        GetUser => user_service::get_user(doc, input)?.into_response(),
        UpdateUser => user_service::update_user(doc, ctx, input)?.into_response(),
        ChangePassword => user_service::change_password(doc, ctx, input)?.into_response(),
        DeleteUser => user_service::delete_user(doc, ctx, input)?.into_response(),

        GetBlogPosts => content_service::list_blog_posts(doc, input)?.into_response(),
        AddBlogPost => content_service::create_blog_post(doc, ctx, input).await?.into_response(),
        EditBlogPost => content_service::update_blog_post(doc, ctx, input).await?.into_response(),
        DeleteBlogPost => content_service::delete_blog_post(doc, ctx, input).await?.into_response(),

        GetGallery => content_service::list_gallery(doc)?.into_response(),
        AddGalleryImage => {
            content_service::create_gallery_image(doc, ctx, input).await?.into_response()
        }
        DeleteGalleryImage => {
            content_service::delete_gallery_image(doc, ctx, input).await?.into_response()
        }

        GetAnnouncements => content_service::list_announcements(doc, input)?.into_response(),
        AddAnnouncement => {
            content_service::create_announcement(doc, ctx, input).await?.into_response()
        }
        EditAnnouncement => {
            content_service::update_announcement(doc, ctx, input).await?.into_response()
        }
        DeleteAnnouncement => {
            content_service::delete_announcement(doc, ctx, input).await?.into_response()
        }

        GetPaymentSettings => settings_service::get_payment_settings(doc)?.into_response(),
        UpdatePaymentSettings => {
            settings_service::update_payment_settings(doc, ctx, input)?.into_response()
        }
        GetShippingSettings => settings_service::get_shipping_settings(doc)?.into_response(),
        UpdateShippingSettings => {
            settings_service::update_shipping_settings(doc, ctx, input)?.into_response()
        }
        CalculateShipping => settings_service::calculate_shipping(doc, input)?.into_response(),

        ImportProducts => {
            import_service::import_products(doc, ctx, input, ImportMode::Replace)?.into_response()
        }
        ImportProductsAdd => {
            import_service::import_products(doc, ctx, input, ImportMode::Merge)?.into_response()
        }
    };
    Ok(response)
}

async fn run(
    state: &AppState,
    name: &str,
    method: &Method,
    session: &SessionToken,
    input: Result<RequestInput, AppError>,
) -> AppResult<Response> {
    let route = Route::lookup(name)
        .ok_or_else(|| AppError::NotFound(format!("Unknown endpoint `{name}`")))?;
    if !route.allows(method) {
        return Err(AppError::MethodNotAllowed(method.to_string()));
    }
    let input = input?;

    let mut doc = state.store.get_or_create(session.as_str()).await?;
    let batch = UploadBatch::new();
    let ctx = RequestContext {
        session: session.as_str(),
        config: &state.config,
        uploads: &state.uploads,
        batch: &batch,
    };
    let result: AppResult<Response> = async {
        let response = dispatch(route.endpoint, &mut doc, &ctx, &input).await?;
        if route.access == Access::Write {
            state.store.save(session.as_str(), &doc).await?;
        }
        Ok(response)
    }
    .await;

    match &result {
        Ok(_) => batch.commit(&state.uploads).await,
        Err(_) => batch.rollback(&state.uploads).await,
    }
    result
}

#[utoipa::path(
    method(get, post, put, delete),
    path = "/api/demo/{endpoint}",
    params(
        ("endpoint" = String, Path, description = "Legacy endpoint name, e.g. `get_products.php`"),
    ),
    responses(
        (status = 200, description = "`{success: true, message?, ...payload}`"),
        (status = 201, description = "Record created"),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorBody),
        (status = 404, description = "Unknown endpoint or record", body = ErrorBody),
        (status = 405, description = "Verb not accepted by the endpoint", body = ErrorBody),
    ),
    tag = "Demo"
)]
pub async fn handle(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    method: Method,
    session: SessionToken,
    input: Result<RequestInput, AppError>,
) -> Response {
    if session.is_new() {
        tracing::debug!(session = %session.as_str(), "new demo session");
    }
    let response = run(&state, &endpoint, &method, &session, input)
        .await
        .unwrap_or_else(IntoResponse::into_response);
    session.attach(response)
}
