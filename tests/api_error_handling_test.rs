use assetdesk::auth::create_jwt;
use assetdesk::config::Config;
use assetdesk::infrastructure::AppState;
use assetdesk::models::user;
use assetdesk::{api, db};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use sea_orm::{EntityTrait, Set};
use serde_json::{Value, json};
use tower::util::ServiceExt;

// Router without the outer layers; paths are relative to `/api`
async fn setup_router() -> (Router, String) {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    let now = chrono::Utc::now().to_rfc3339();
    let id = user::Entity::insert(user::ActiveModel {
        username: Set("clerk".to_string()),
        password_hash: Set("unused".to_string()),
        role: Set("user".to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    })
    .exec(&db)
    .await
    .expect("Failed to create user")
    .last_insert_id;
    let token = create_jwt(id, "clerk", "user").unwrap();

    let mut config = Config::for_profile("test".to_string());
    config.media_root = std::env::temp_dir().join("assetdesk-error-tests");
    (api::api_router(AppState::new(db, config)), token)
}

async fn call(router: &Router, method: &str, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn assert_envelope(body: &Value, error_type: &str) {
    assert_eq!(body["success"], false, "{body}");
    assert_eq!(body["error"], true, "{body}");
    assert_eq!(body["error_type"], error_type, "{body}");
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
}

#[tokio::test]
async fn test_missing_product_is_not_found() {
    let (router, token) = setup_router().await;
    let (status, body) = call(&router, "GET", "/products/9999", &token, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_envelope(&body, "not_found");
}

#[tokio::test]
async fn test_missing_assignment_is_not_found() {
    let (router, token) = setup_router().await;
    let (status, body) = call(
        &router,
        "POST",
        "/assignments/42/return",
        &token,
        Some(json!({ "returned_on": "2024-01-01", "condition": "bueno" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_envelope(&body, "not_found");
}

#[tokio::test]
async fn test_validation_errors_are_bad_request() {
    let (router, token) = setup_router().await;

    let (status, body) = call(
        &router,
        "POST",
        "/categories",
        &token,
        Some(json!({ "name": "  ", "code": "X" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_envelope(&body, "validation");

    let (status, body) = call(
        &router,
        "POST",
        "/employees",
        &token,
        Some(json!({
            "name": "Someone",
            "national_id": "1234",
            "email": "someone@example.com",
            "department_id": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_envelope(&body, "validation");
}

#[tokio::test]
async fn test_unique_name_conflict() {
    let (router, token) = setup_router().await;
    let brand = json!({ "name": "Apple" });

    let (status, _) = call(&router, "POST", "/brands", &token, Some(brand.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(&router, "POST", "/brands", &token, Some(brand)).await;
    assert!(
        status == StatusCode::CONFLICT || status == StatusCode::BAD_REQUEST,
        "{status}"
    );
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_unknown_export_format_is_rejected() {
    let (router, token) = setup_router().await;
    let (status, _) = call(&router, "GET", "/export?type=products&format=pdf", &token, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_product_type_detection_without_match() {
    let (router, token) = setup_router().await;
    let (status, body) = call(&router, "GET", "/product-types/detect?category_id=7", &token, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body["product_type"].is_null());
}

#[tokio::test]
async fn test_malformed_token_is_rejected() {
    let (router, _) = setup_router().await;
    let (status, body) = call(&router, "GET", "/products", "not-a-jwt", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}
