use assetdesk::auth::create_jwt;
use assetdesk::config::Config;
use assetdesk::infrastructure::AppState;
use assetdesk::models::user;
use assetdesk::{db, server};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

struct TestApp {
    router: Router,
    db: DatabaseConnection,
    media: TempDir,
    admin_token: String,
    user_token: String,
}

async fn create_user(db: &DatabaseConnection, username: &str, role: &str) -> String {
    let now = chrono::Utc::now().to_rfc3339();
    let account = user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set("unused".to_string()),
        role: Set(role.to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    let id = user::Entity::insert(account)
        .exec(db)
        .await
        .expect("Failed to create user")
        .last_insert_id;
    create_jwt(id, username, role).expect("Failed to create JWT")
}

async fn setup_app() -> TestApp {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    let media = tempfile::tempdir().expect("Failed to create media dir");

    let mut config = Config::for_profile("test".to_string());
    config.media_root = media.path().to_path_buf();

    let admin_token = create_user(&db, "admin", "admin").await;
    let user_token = create_user(&db, "clerk", "user").await;
    let router = server::build_router(AppState::new(db.clone(), config));

    TestApp {
        router,
        db,
        media,
        admin_token,
        user_token,
    }
}

async fn send(
    app: &TestApp,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

/// Category, brand, department with one employee. Returns their ids.
async fn seed_catalog(app: &TestApp) -> (i64, i64, i64, i64) {
    let token = Some(app.admin_token.as_str());

    let (status, body) = send(
        app,
        "POST",
        "/api/categories",
        token,
        Some(json!({
            "name": "Laptops",
            "code": "lap",
            "specific_fields": {
                "ram_gb": { "kind": "number", "label": "RAM", "required": true }
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let category_id = body["item"]["id"].as_i64().unwrap();

    let (_, body) = send(app, "POST", "/api/brands", token, Some(json!({ "name": "Dell" }))).await;
    let brand_id = body["item"]["id"].as_i64().unwrap();

    let (_, body) = send(
        app,
        "POST",
        "/api/departments",
        token,
        Some(json!({ "name": "Finance", "code": "FIN" })),
    )
    .await;
    let department_id = body["item"]["id"].as_i64().unwrap();

    let (status, body) = send(
        app,
        "POST",
        "/api/employees",
        token,
        Some(json!({
            "name": "Lucía Pérez",
            "national_id": "87654321X",
            "email": "lucia@example.com",
            "department_id": department_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let employee_id = body["item"]["id"].as_i64().unwrap();

    (category_id, brand_id, department_id, employee_id)
}

async fn create_laptop(app: &TestApp, category_id: i64, brand_id: i64, serial: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/products",
        Some(&app.user_token),
        Some(json!({
            "category_id": category_id,
            "brand_id": brand_id,
            "model": "Latitude 7440",
            "serial_number": serial,
            "purchased_on": "2024-01-15",
            "purchase_price": 1299.0,
            "specifications": { "ram_gb": 16, "colour": "grey" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["product"].clone()
}

#[tokio::test]
async fn test_health_check_is_public() {
    let app = setup_app().await;
    let (status, body) = send(&app, "GET", "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = setup_app().await;

    for uri in ["/api/products", "/api/assignments", "/api/dashboard", "/api/categories"] {
        let (status, _) = send(&app, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_product_registration_generates_identifiers() {
    let app = setup_app().await;
    let (category_id, brand_id, _, _) = seed_catalog(&app).await;

    let product = create_laptop(&app, category_id, brand_id, "SN-0001").await;

    assert_eq!(product["state"], "DISPONIBLE");
    assert_eq!(product["condition"], "NUEVO");
    let internal_id = product["internal_id"].as_str().unwrap();
    assert!(internal_id.starts_with("LAP"), "{internal_id}");
    assert_eq!(internal_id.len(), 7);

    // Attributes not defined by the category are dropped
    let id = product["id"].as_i64().unwrap();
    let (status, detail) = send(
        &app,
        "GET",
        &format!("/api/products/{id}"),
        Some(&app.user_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["specifications_parsed"]["ram_gb"], 16.0);
    assert!(detail["specifications_parsed"].get("colour").is_none());

    // Registration is recorded in the movement ledger
    let (_, movements) = send(&app, "GET", "/api/movements", Some(&app.user_token), None).await;
    assert_eq!(movements["total"], 1);
    assert_eq!(movements["movements"][0]["kind"], "ALTA");
}

#[tokio::test]
async fn test_duplicate_serial_is_rejected() {
    let app = setup_app().await;
    let (category_id, brand_id, _, _) = seed_catalog(&app).await;
    create_laptop(&app, category_id, brand_id, "SN-DUP").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/products",
        Some(&app.user_token),
        Some(json!({
            "category_id": category_id,
            "brand_id": brand_id,
            "model": "Latitude 7440",
            "serial_number": "SN-DUP",
            "purchased_on": "2024-01-15",
            "purchase_price": 999.0,
            "specifications": { "ram_gb": 8 }
        })),
    )
    .await;

    assert!(status.is_client_error(), "{status}");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_product_list_reports_state_counts() {
    let app = setup_app().await;
    let (category_id, brand_id, _, _) = seed_catalog(&app).await;
    create_laptop(&app, category_id, brand_id, "SN-A").await;
    create_laptop(&app, category_id, brand_id, "SN-B").await;

    let (status, body) = send(
        &app,
        "GET",
        "/api/products?search=SN-A",
        Some(&app.user_token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["products"][0]["serial_number"], "SN-A");
    assert_eq!(body["counts"]["DISPONIBLE"], 2);
}

#[tokio::test]
async fn test_delivery_and_return_through_api() {
    let app = setup_app().await;
    let (category_id, brand_id, department_id, employee_id) = seed_catalog(&app).await;
    let product = create_laptop(&app, category_id, brand_id, "SN-FLOW").await;
    let product_id = product["id"].as_i64().unwrap();
    let today = chrono::Local::now().date_naive().format("%Y-%m-%d").to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/assignments",
        Some(&app.user_token),
        Some(json!({
            "product_id": product_id,
            "department_id": department_id,
            "employee_id": employee_id,
            "kind": "ENTREGA",
            "delivered_on": today
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let assignment_id = body["assignment"]["id"].as_i64().unwrap();

    let (_, detail) = send(
        &app,
        "GET",
        &format!("/api/products/{product_id}"),
        Some(&app.user_token),
        None,
    )
    .await;
    assert_eq!(detail["state"], "ENTREGADO");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/assignments/{assignment_id}/return"),
        Some(&app.user_token),
        Some(json!({ "returned_on": today, "condition": "bueno" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["assignment"]["returned_at"].is_string());
    assert_eq!(body["assignment"]["condition_on_return"], "bueno");

    let (_, detail) = send(
        &app,
        "GET",
        &format!("/api/products/{product_id}"),
        Some(&app.user_token),
        None,
    )
    .await;
    assert_eq!(detail["state"], "DISPONIBLE");

    // Second return of the same assignment
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/assignments/{assignment_id}/return"),
        Some(&app.user_token),
        Some(json!({ "returned_on": today, "condition": "bueno" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_type"], "business_rule");
}

#[tokio::test]
async fn test_catalog_delete_requires_admin() {
    let app = setup_app().await;
    let (_, body) = send(
        &app,
        "POST",
        "/api/brands",
        Some(&app.user_token),
        Some(json!({ "name": "HP" })),
    )
    .await;
    let brand_id = body["item"]["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/brands/{brand_id}"),
        Some(&app.user_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/brands/{brand_id}"),
        Some(&app.admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_catalog_toggle_hides_from_active_list() {
    let app = setup_app().await;
    let (_, body) = send(
        &app,
        "POST",
        "/api/locations",
        Some(&app.user_token),
        Some(json!({ "name": "Server room", "building": "B" })),
    )
    .await;
    let location_id = body["item"]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/locations/{location_id}/toggle"),
        Some(&app.user_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["active"], false);

    let (_, body) = send(&app, "GET", "/api/locations?active=true", Some(&app.user_token), None).await;
    assert_eq!(body["total"], 0);
    let (_, body) = send(&app, "GET", "/api/locations", Some(&app.user_token), None).await;
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_sticker_generation_writes_png() {
    let app = setup_app().await;
    let (category_id, brand_id, _, _) = seed_catalog(&app).await;
    let product = create_laptop(&app, category_id, brand_id, "SN/STICKER 1").await;
    let product_id = product["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/products/{product_id}/stickers"),
        Some(&app.user_token),
        Some(json!({ "kinds": ["QR", "CODIGO_BARRAS", "NOPE"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let stickers = body["stickers"].as_array().unwrap();
    assert_eq!(stickers.len(), 2);

    let image_path = stickers[0]["image_path"].as_str().unwrap();
    assert!(image_path.starts_with("pegatinas/"), "{image_path}");
    assert!(!image_path.contains(' '));
    assert!(app.media.path().join(image_path).exists());

    let sticker_id = stickers[0]["id"].as_i64().unwrap();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/stickers/{sticker_id}/download"))
                .header(header::AUTHORIZATION, format!("Bearer {}", app.user_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

    let (status, printable) = send(
        &app,
        "GET",
        &format!("/api/stickers/{sticker_id}/print"),
        Some(&app.user_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(printable["image"].as_str().unwrap().starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_product_type_serials_and_custom_data() {
    let app = setup_app().await;
    let (category_id, brand_id, _, _) = seed_catalog(&app).await;
    let product = create_laptop(&app, category_id, brand_id, "SN-TYPE").await;
    let product_id = product["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/product-types",
        Some(&app.user_token),
        Some(json!({
            "name": "Ultrabook",
            "code_prefix": "ub",
            "custom_fields": {
                "dock": { "kind": "select", "options": ["USB-C", "Thunderbolt"] }
            },
            "category_ids": [category_id]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let type_id = body["product_type"]["id"].as_i64().unwrap();
    assert_eq!(body["product_type"]["code_prefix"], "UB");

    let (_, detected) = send(
        &app,
        "GET",
        &format!("/api/product-types/detect?category_id={category_id}"),
        Some(&app.user_token),
        None,
    )
    .await;
    assert_eq!(detected["product_type"]["id"], type_id);

    for expected in ["UB0001", "UB0002"] {
        let (_, body) = send(
            &app,
            "POST",
            &format!("/api/product-types/{type_id}/next-serial"),
            Some(&app.user_token),
            None,
        )
        .await;
        assert_eq!(body["serial_number"], expected);
    }

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/products/{product_id}/custom-data"),
        Some(&app.user_token),
        Some(json!({ "product_type_id": type_id, "data": { "dock": "Floppy" } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/products/{product_id}/custom-data"),
        Some(&app.user_token),
        Some(json!({ "product_type_id": type_id, "data": { "dock": "USB-C", "extra": 1 } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["custom_data"]["data"]["dock"], "USB-C");
    assert!(body["custom_data"]["data"].get("extra").is_none());

    // In use, so it cannot be deleted
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/product-types/{type_id}"),
        Some(&app.user_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_csv_export_and_admin_backup() {
    let app = setup_app().await;
    let (category_id, brand_id, _, _) = seed_catalog(&app).await;
    create_laptop(&app, category_id, brand_id, "SN-EXPORT").await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/export?type=products&format=csv")
                .header(header::AUTHORIZATION, format!("Bearer {}", app.user_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("SN-EXPORT"));

    let (status, _) = send(&app, "GET", "/api/backup", Some(&app.user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "GET", "/api/backup", Some(&app.admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["user"], "admin");
    assert_eq!(body["products"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_dashboard_counts() {
    let app = setup_app().await;
    let (category_id, brand_id, _, _) = seed_catalog(&app).await;
    create_laptop(&app, category_id, brand_id, "SN-DASH").await;

    let (status, body) = send(&app, "GET", "/api/dashboard", Some(&app.user_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_products"], 1);
    assert_eq!(body["available"], 1);
    assert_eq!(body["departments"], 1);
    assert_eq!(body["employees"], 1);

    // The test database handle stays usable alongside the router
    assert!(
        user::Entity::find()
            .all(&app.db)
            .await
            .unwrap()
            .len()
            >= 2
    );
}
