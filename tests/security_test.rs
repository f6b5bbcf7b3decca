use assetdesk::auth::{create_jwt, decode_jwt, hash_password, verify_password};
use assetdesk::config::Config;
use assetdesk::infrastructure::AppState;
use assetdesk::models::user;
use assetdesk::{api, db};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use serde_json::{Value, json};
use tower::util::ServiceExt; // for `oneshot`

// Helper to create a test database
async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

fn router_for(db: DatabaseConnection) -> Router {
    let mut config = Config::for_profile("test".to_string());
    config.media_root = std::env::temp_dir().join("assetdesk-security-tests");
    api::api_router(AppState::new(db, config))
}

async fn post_json(router: &Router, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let response = router
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_password_hashing() {
    let password = "super_secret_password";
    let hash = hash_password(password).expect("Failed to hash password");

    assert_ne!(password, hash);
    assert!(verify_password(password, &hash).unwrap());
    assert!(!verify_password("wrong_password", &hash).unwrap());
}

#[tokio::test]
async fn test_jwt_creation_and_verification() {
    let token = create_jwt(7, "test_user", "admin").expect("Failed to create JWT");
    assert!(!token.is_empty());

    let claims = decode_jwt(&token).expect("Failed to verify JWT");
    assert_eq!(claims.sub, "test_user");
    assert_eq!(claims.uid, 7);
    assert!(claims.is_admin());

    assert!(decode_jwt(&format!("{}x", token)).is_err());
}

#[tokio::test]
async fn test_login_flow() {
    let db = setup_test_db().await;

    // 1. Create Admin User manually
    let password = "admin_password";
    let hash = hash_password(password).unwrap();
    user::Entity::insert(user::ActiveModel {
        username: Set("admin".to_string()),
        password_hash: Set(hash),
        role: Set("admin".to_string()),
        created_at: Set(chrono::Utc::now().to_rfc3339()),
        updated_at: Set(chrono::Utc::now().to_rfc3339()),
        ..Default::default()
    })
    .exec(&db)
    .await
    .expect("Failed to insert user");

    let router = router_for(db);

    // 2. Wrong password
    let (status, body) = post_json(
        &router,
        "/auth/login",
        None,
        json!({ "username": "admin", "password": "nope" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_type"], "authentication");

    // 3. Correct password
    let (status, body) = post_json(
        &router,
        "/auth/login",
        None,
        json!({ "username": "admin", "password": password }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();
    assert_eq!(decode_jwt(token).unwrap().role, "admin");
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_first_account_is_admin_then_registration_is_closed() {
    let db = setup_test_db().await;
    let router = router_for(db.clone());

    let (status, body) = post_json(
        &router,
        "/auth/register",
        None,
        json!({ "username": "founder", "password": "long-enough", "role": "user" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"]["role"], "admin");

    // Anonymous second registration
    let (status, _) = post_json(
        &router,
        "/auth/register",
        None,
        json!({ "username": "intruder", "password": "long-enough" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Non-admin caller
    let user_token = create_jwt(99, "clerk", "user").unwrap();
    let (status, _) = post_json(
        &router,
        "/auth/register",
        Some(&user_token),
        json!({ "username": "intruder", "password": "long-enough" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Admin caller, short password
    let admin_token = create_jwt(1, "founder", "admin").unwrap();
    let (status, _) = post_json(
        &router,
        "/auth/register",
        Some(&admin_token),
        json!({ "username": "newbie", "password": "short" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post_json(
        &router,
        "/auth/register",
        Some(&admin_token),
        json!({ "username": "newbie", "password": "long-enough" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "user");

    assert_eq!(user::Entity::find().count(&db).await.unwrap(), 2);
}

#[tokio::test]
async fn test_retiring_a_product_requires_admin() {
    let db = setup_test_db().await;
    let router = router_for(db);
    let user_token = create_jwt(5, "clerk", "user").unwrap();

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/products/1")
                .header(header::AUTHORIZATION, format!("Bearer {}", user_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
