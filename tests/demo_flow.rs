use std::{path::PathBuf, sync::Arc};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use demo_store_api::{
    config::AppConfig,
    import::Sheet,
    routes::create_app,
    services::import_service::{ImportMode, import_sheets},
    state::AppState,
    store::{DocumentStore, MemoryStore},
};
use rust_xlsxwriter::Workbook;
use serde_json::{Value, json};
use tower::ServiceExt;

const BOUNDARY: &str = "demo-store-boundary";

struct TestApp {
    _dir: tempfile::TempDir,
    uploads: PathBuf,
    store: Arc<MemoryStore>,
    router: Router,
}

/// One part of a multipart form body.
enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        field: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

impl<'a> Part<'a> {
    fn png(field: &'a str, file_name: &'a str) -> Self {
        Part::File {
            field,
            file_name,
            content_type: "image/png",
            bytes: b"\x89PNG",
        }
    }
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                field,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

struct Reply {
    status: StatusCode,
    cookie: Option<String>,
    body: Value,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(MemoryStore::new());
        let config = AppConfig::for_dir(dir.path());
        let uploads = config.uploads_dir.clone();
        let state = AppState::new(config, store.clone());
        Self {
            _dir: dir,
            uploads,
            store,
            router: create_app(state),
        }
    }

    async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Reply {
            status,
            cookie,
            body,
        }
    }

    async fn get(&self, cookie: Option<&str>, uri: &str) -> Reply {
        let mut builder = Request::get(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post(&self, cookie: &str, uri: &str, body: Value) -> Reply {
        let request = Request::post(uri)
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn post_form(&self, cookie: &str, uri: &str, parts: &[Part<'_>]) -> Reply {
        let request = Request::post(uri)
            .header(header::COOKIE, cookie)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        self.send(request).await
    }

    /// Disk location of a public `/demo-uploads/...` path.
    fn upload_file(&self, public_path: &str) -> PathBuf {
        self.uploads.join(public_path.trim_start_matches("/demo-uploads/"))
    }

    fn stored_uploads(&self) -> usize {
        std::fs::read_dir(&self.uploads)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    /// Starts a session and returns its `demo-session=<token>` cookie pair.
    async fn session(&self) -> String {
        self.get(None, "/api/demo/get_categories.php")
            .await
            .cookie
            .expect("session cookie")
    }
}

fn token(cookie: &str) -> &str {
    cookie.trim_start_matches("demo-session=")
}

#[tokio::test]
async fn new_session_bootstraps_seed_catalogue() {
    let app = TestApp::new();
    let reply = app.get(None, "/api/demo/get_products.php").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["success"], json!(true));
    assert_eq!(reply.body["total"], json!(6));
    assert_eq!(reply.body["products"].as_array().map(Vec::len), Some(6));
    assert_eq!(reply.body["stats"]["total"], json!(6));
    let cookie = reply.cookie.expect("Set-Cookie");
    assert!(cookie.starts_with("demo-session="));
    assert_eq!(app.store.session_count().await, 1);
}

#[tokio::test]
async fn added_product_is_listed_with_low_stock() {
    let app = TestApp::new();
    let cookie = app.session().await;

    let created = app
        .post(
            &cookie,
            "/api/demo/add_product.php",
            json!({"name": "Test Sauce", "price": "7.50", "stock": 5, "category": "hot-sauce"}),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["product"]["id"], json!(7));

    let listed = app
        .get(Some(&cookie), "/api/demo/get_products.php?search=test%20sauce")
        .await;
    assert_eq!(listed.body["total"], json!(1));
    assert_eq!(listed.body["products"][0]["stock_status"], json!("low_stock"));
    assert_eq!(listed.body["stats"]["total"], json!(7));

    // other sessions keep the untouched seed
    let other = app.get(None, "/api/demo/get_products.php").await;
    assert_eq!(other.body["total"], json!(6));
}

#[tokio::test]
async fn duplicate_category_slug_is_rejected() {
    let app = TestApp::new();
    let cookie = app.session().await;

    let first = app
        .post(&cookie, "/api/demo/add_category.php", json!({"name": "Grill Saucen"}))
        .await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["category"]["slug"], json!("grill-saucen"));

    let second = app
        .post(&cookie, "/api/demo/add_category.php", json!({"name": "grill saucen"}))
        .await;
    assert_eq!(second.status, StatusCode::BAD_REQUEST);
    assert_eq!(second.body["success"], json!(false));
    assert!(second.body["error"].is_string());

    let listed = app.get(Some(&cookie), "/api/demo/get_categories.php").await;
    assert_eq!(listed.body["total"], json!(3));
}

#[tokio::test]
async fn order_items_are_snapshots() {
    let app = TestApp::new();
    let cookie = app.session().await;

    let created = app
        .post(
            &cookie,
            "/api/demo/add_order.php",
            json!({
                "customer_name": "Anna Muster",
                "customer_email": "anna@example.ch",
                "items": [{"product_id": 2, "quantity": 2}],
            }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let order_id = created.body["order_id"].as_i64().expect("order id");
    assert!(created.body["order_number"].as_str().unwrap().starts_with("ORD-"));

    let edited = app
        .post(
            &cookie,
            "/api/demo/edit_product.php",
            json!({"id": 2, "name": "Renamed", "price": "99.00"}),
        )
        .await;
    assert_eq!(edited.status, StatusCode::OK);

    let order = app
        .get(Some(&cookie), &format!("/api/demo/get_order.php?id={order_id}"))
        .await;
    let item = &order.body["order"]["items"][0];
    assert_eq!(item["product_name"], json!("Smoky Chipotle"));
    assert_eq!(item["unit_price"], json!(9.9));

    let product = app.get(Some(&cookie), "/api/demo/get_product.php?id=2").await;
    assert_eq!(product.body["product"]["stock"], json!(6));
}

#[tokio::test]
async fn unknown_endpoint_and_wrong_verb() {
    let app = TestApp::new();

    let missing = app.get(None, "/api/demo/drop_everything.php").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["success"], json!(false));
    assert!(missing.cookie.is_some());

    let wrong_verb = app.get(None, "/api/demo/add_product.php").await;
    assert_eq!(wrong_verb.status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn user_flow_uses_bearer_token() {
    let app = TestApp::new();
    let cookie = app.session().await;

    let registered = app
        .post(
            &cookie,
            "/api/demo/register.php",
            json!({"email": "demo@example.ch", "password": "geheim1", "first_name": "Demo"}),
        )
        .await;
    assert_eq!(registered.status, StatusCode::CREATED);
    let bearer = registered.body["token"].as_str().expect("token").to_string();

    let request = Request::get("/api/demo/get_user.php")
        .header(header::COOKIE, &cookie)
        .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
        .body(Body::empty())
        .unwrap();
    let me = app.send(request).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user"]["first_name"], json!("Demo"));
    assert!(me.body["user"].get("password").is_none());

    let anonymous = app.get(Some(&cookie), "/api/demo/get_user.php").await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn shipping_quote_for_switzerland() {
    let app = TestApp::new();
    let reply = app
        .get(None, "/api/demo/calculate_shipping.php?country=ch&weight_kg=0.8")
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["zone"], json!("Schweiz"));
    assert_eq!(reply.body["shipping_cost"], json!(9.0));
    assert_eq!(reply.body["free_shipping"], json!(false));
}

#[tokio::test]
async fn merge_import_updates_in_place() {
    let app = TestApp::new();
    let cookie = app.session().await;

    let mut doc = app.store.get_or_create(token(&cookie)).await.unwrap();
    let sheets = [Sheet {
        name: "Hot Sauce".to_string(),
        rows: vec![
            vec!["Artikelnummer".into(), "Bezeichnung".into(), "Lagerbestand".into()],
            vec!["2".into(), "Smoky Chipotle Reserve".into(), "30".into()],
        ],
    }];
    let summary =
        import_sheets(&mut doc, &sheets, "bilder.hot-sauce-shop.ch", ImportMode::Merge).unwrap();
    assert_eq!((summary.updated, summary.inserted), (1, 0));
    app.store.save(token(&cookie), &doc).await.unwrap();

    let listed = app.get(Some(&cookie), "/api/demo/get_products.php").await;
    assert_eq!(listed.body["total"], json!(6));
    let product = app.get(Some(&cookie), "/api/demo/get_product.php?id=2").await;
    assert_eq!(product.body["product"]["name"], json!("Smoky Chipotle Reserve"));
    assert_eq!(product.body["product"]["stock"], json!(30));
}

/// Adds a product with one uploaded image and returns its id and public image path.
async fn product_with_image(app: &TestApp, cookie: &str) -> (i64, String) {
    let created = app
        .post_form(
            cookie,
            "/api/demo/add_product.php",
            &[Part::Text("name", "Ghost Pepper"), Part::png("image", "a.png")],
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.body["product"]["id"].as_i64().expect("product id");
    let image = created.body["product"]["image"]
        .as_str()
        .expect("image path")
        .to_string();
    assert!(app.upload_file(&image).exists());
    (id, image)
}

#[tokio::test]
async fn rejected_edit_keeps_old_image_and_leaves_no_orphan() {
    let app = TestApp::new();
    let cookie = app.session().await;
    let (id, old_image) = product_with_image(&app, &cookie).await;
    let id = id.to_string();

    let edited = app
        .post_form(
            &cookie,
            "/api/demo/edit_product.php",
            &[
                Part::Text("id", &id),
                Part::png("image", "b.png"),
                Part::png("image_2", "evil.php"),
            ],
        )
        .await;
    assert_eq!(edited.status, StatusCode::BAD_REQUEST);
    assert_eq!(edited.body["success"], json!(false));

    assert!(app.upload_file(&old_image).exists());
    assert_eq!(app.stored_uploads(), 1);
    let product = app
        .get(Some(&cookie), &format!("/api/demo/get_product.php?id={id}"))
        .await;
    assert_eq!(product.body["product"]["image"], json!(old_image));
}

#[tokio::test]
async fn replaced_image_is_deleted_once_saved() {
    let app = TestApp::new();
    let cookie = app.session().await;
    let (id, old_image) = product_with_image(&app, &cookie).await;
    let id = id.to_string();

    let edited = app
        .post_form(
            &cookie,
            "/api/demo/edit_product.php",
            &[Part::Text("id", &id), Part::png("image", "b.png")],
        )
        .await;
    assert_eq!(edited.status, StatusCode::OK);
    let new_image = edited.body["product"]["image"].as_str().expect("image").to_string();
    assert_ne!(new_image, old_image);
    assert!(!app.upload_file(&old_image).exists());
    assert!(app.upload_file(&new_image).exists());
    assert_eq!(app.stored_uploads(), 1);
}

#[tokio::test]
async fn remove_image_clears_slot_and_file() {
    let app = TestApp::new();
    let cookie = app.session().await;
    let (id, image) = product_with_image(&app, &cookie).await;
    let id = id.to_string();

    let edited = app
        .post_form(
            &cookie,
            "/api/demo/edit_product.php",
            &[Part::Text("id", &id), Part::Text("remove_image", "1")],
        )
        .await;
    assert_eq!(edited.status, StatusCode::OK);
    assert_eq!(edited.body["product"]["image"], json!(null));
    assert!(!app.upload_file(&image).exists());
    assert_eq!(app.stored_uploads(), 0);
}

#[tokio::test]
async fn kept_slot_survives_upload_to_another_slot() {
    let app = TestApp::new();
    let cookie = app.session().await;
    let created = app
        .post_form(
            &cookie,
            "/api/demo/add_product.php",
            &[
                Part::Text("name", "Carolina Reaper"),
                Part::png("image", "front.png"),
                Part::png("image_2", "back.png"),
            ],
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.body["product"]["id"].as_i64().expect("id").to_string();
    let second = created.body["product"]["image_2"].as_str().expect("image_2").to_string();

    let edited = app
        .post_form(
            &cookie,
            "/api/demo/edit_product.php",
            &[
                Part::Text("id", &id),
                Part::Text("keep_image_2", "1"),
                Part::png("image_3", "side.png"),
            ],
        )
        .await;
    assert_eq!(edited.status, StatusCode::OK);
    assert_eq!(edited.body["product"]["image_2"], json!(second));
    assert!(edited.body["product"]["image_3"].is_string());
    assert!(app.upload_file(&second).exists());
    assert_eq!(app.stored_uploads(), 3);
}

/// A workbook with one "Hot Sauce" sheet holding `rows` below a German header.
fn hot_sauce_workbook(rows: &[(f64, &str, f64)]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Hot Sauce").unwrap();
    for (col, header) in ["Artikelnummer", "Bezeichnung", "Preis"].into_iter().enumerate() {
        sheet.write_string(0, col as u16, header).unwrap();
    }
    for (index, (id, name, price)) in rows.iter().enumerate() {
        let row = index as u32 + 1;
        sheet.write_number(row, 0, *id).unwrap();
        sheet.write_string(row, 1, *name).unwrap();
        sheet.write_number(row, 2, *price).unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

fn xlsx_part(bytes: &[u8]) -> Part<'_> {
    Part::File {
        field: "file",
        file_name: "produkte.xlsx",
        content_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        bytes,
    }
}

#[tokio::test]
async fn xlsx_upload_merges_into_catalogue() {
    let app = TestApp::new();
    let cookie = app.session().await;
    let workbook = hot_sauce_workbook(&[(2.0, "Smoky Chipotle XL", 11.5)]);

    let reply = app
        .post_form(&cookie, "/api/demo/import_products_add.php", &[xlsx_part(&workbook)])
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["updated"], json!(1));
    assert_eq!(reply.body["inserted"], json!(0));
    assert_eq!(reply.body["total"], json!(6));

    let product = app.get(Some(&cookie), "/api/demo/get_product.php?id=2").await;
    assert_eq!(product.body["product"]["name"], json!("Smoky Chipotle XL"));
    assert_eq!(product.body["product"]["price"], json!(11.5));
}

#[tokio::test]
async fn xlsx_upload_replaces_catalogue() {
    let app = TestApp::new();
    let cookie = app.session().await;
    let workbook = hot_sauce_workbook(&[(50.0, "Scotch Bonnet", 8.9), (51.0, "Trinidad Scorpion", 14.0)]);

    let reply = app
        .post_form(&cookie, "/api/demo/import_products.php", &[xlsx_part(&workbook)])
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["inserted"], json!(2));
    assert_eq!(reply.body["total"], json!(2));

    let listed = app.get(Some(&cookie), "/api/demo/get_products.php").await;
    assert_eq!(listed.body["total"], json!(2));
}

#[tokio::test]
async fn workbook_without_header_is_rejected_before_replacing() {
    let app = TestApp::new();
    let cookie = app.session().await;
    let mut workbook = Workbook::new();
    workbook
        .add_worksheet()
        .write_string(0, 0, "Einkaufsliste")
        .unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let reply = app
        .post_form(&cookie, "/api/demo/import_products.php", &[xlsx_part(&bytes)])
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let listed = app.get(Some(&cookie), "/api/demo/get_products.php").await;
    assert_eq!(listed.body["total"], json!(6));
}
