use crate::auth::{Claims, create_jwt, hash_password, verify_password};
use crate::domain::DomainError;
use crate::models::user::{self, Entity as User};
use crate::services::Actor;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use sea_orm::*;
use serde::Deserialize;
use serde_json::json;

use super::error::{ApiError, ApiResult};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    responses(
        (status = 200, description = "Bearer token issued"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    tracing::info!("Login attempt for user: {}", payload.username);

    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let Some(user) = User::find()
        .filter(user::Column::Username.eq(payload.username.trim()))
        .one(&db)
        .await
        .map_err(DomainError::from)?
    else {
        tracing::warn!("User not found: {}", payload.username);
        return Err(invalid());
    };

    match verify_password(&payload.password, &user.password_hash) {
        Ok(true) => {
            let token = create_jwt(user.id, &user.username, &user.role)
                .map_err(DomainError::Internal)?;
            tracing::info!(user = %user.username, action = "LOGIN");
            Ok(Json(json!({
                "success": true,
                "token": token,
                "user": user,
            })))
        }
        _ => {
            tracing::warn!("Password verification failed for user: {}", user.username);
            Err(invalid())
        }
    }
}

/// Tokens are stateless; this only records the event
pub async fn logout(claims: Claims) -> impl IntoResponse {
    tracing::info!(user = %claims.sub, action = "LOGOUT");
    Json(json!({ "success": true, "message": "Logged out" }))
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    username: String,
    password: String,
    /// `admin` or `user`; ignored for the very first account, which is always admin
    role: Option<String>,
}

/// Create the first administrator, or (as an admin) another account
pub async fn register(
    State(db): State<DatabaseConnection>,
    claims: Option<Claims>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let existing = User::find().count(&db).await.map_err(DomainError::from)?;

    let role = if existing == 0 {
        "admin".to_string()
    } else {
        let claims = claims.ok_or_else(|| {
            ApiError::Unauthorized("Registration requires an administrator".to_string())
        })?;
        Actor::from(&claims).require_admin("create accounts")?;
        match payload.role.as_deref() {
            Some("admin") => "admin".to_string(),
            Some("user") | None => "user".to_string(),
            Some(other) => {
                return Err(DomainError::Validation(format!("Unknown role '{}'", other)).into());
            }
        }
    };

    let username = payload.username.trim().to_string();
    if username.is_empty() {
        return Err(DomainError::Validation("Username is required".to_string()).into());
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ))
        .into());
    }

    let password_hash = hash_password(&payload.password).map_err(DomainError::Internal)?;
    let now = chrono::Utc::now().to_rfc3339();

    let user = user::ActiveModel {
        username: Set(username),
        password_hash: Set(password_hash),
        role: Set(role),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await
    .map_err(DomainError::from)?;

    tracing::info!(user = %user.username, role = %user.role, action = "USER_REGISTERED");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "user": user })),
    ))
}

pub async fn me(
    State(db): State<DatabaseConnection>,
    claims: Claims,
) -> ApiResult<impl IntoResponse> {
    let user = User::find_by_id(claims.uid)
        .one(&db)
        .await
        .map_err(DomainError::from)?
        .ok_or_else(|| DomainError::not_found("User"))?;
    Ok(Json(json!({ "user": user })))
}
