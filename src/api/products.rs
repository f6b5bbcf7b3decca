use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde_json::json;

use super::error::{ApiError, ApiResult};
use crate::auth::Claims;
use crate::infrastructure::AppState;
use crate::services::Actor;
use crate::services::product_service::{
    self, CreateProductInput, ProductFilter, UpdateProductInput,
};

#[utoipa::path(
    get,
    path = "/api/products",
    responses(
        (status = 200, description = "Active products with per-state counts"),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn list_products(
    State(db): State<DatabaseConnection>,
    _claims: Claims,
    Query(filter): Query<ProductFilter>,
) -> ApiResult<impl IntoResponse> {
    let list = product_service::list_products(&db, filter).await?;
    Ok(Json(list))
}

#[utoipa::path(
    post,
    path = "/api/products",
    responses(
        (status = 201, description = "Product registered"),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_product(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(input): Json<CreateProductInput>,
) -> ApiResult<impl IntoResponse> {
    let product = product_service::create_product(&db, input, &Actor::from(&claims)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": format!("Product {} registered", product.internal_id),
            "product": product,
        })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product with related data"),
        (status = 404, description = "Product not found")
    )
)]
pub async fn get_product(
    State(db): State<DatabaseConnection>,
    _claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(product_service::get_product(&db, id).await?))
}

pub async fn update_product(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(input): Json<UpdateProductInput>,
) -> ApiResult<impl IntoResponse> {
    let product = product_service::update_product(&db, id, input, &Actor::from(&claims)).await?;
    Ok(Json(json!({ "success": true, "product": product })))
}

/// Retire (soft-delete) a product
pub async fn delete_product(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let product = product_service::retire_product(&db, id, &Actor::from(&claims)).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Product {} retired", product.internal_id),
    })))
}

/// Multipart upload, field `image`
pub async fn upload_image(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid upload: {}", e)))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid upload: {}", e)))?;

        let product = product_service::attach_image(
            state.db(),
            &state.config.media_root,
            state.config.max_upload_mb * 1024 * 1024,
            id,
            &filename,
            &bytes,
        )
        .await?;

        tracing::info!(user = %claims.sub, action = "PRODUCT_IMAGE_UPLOADED", product_id = id);
        return Ok(Json(json!({
            "success": true,
            "image_path": product.image_path,
        })));
    }

    Err(ApiError::BadRequest("No image was uploaded".to_string()))
}

/// Field definitions of a category, used to build the specifications form
pub async fn category_fields(
    State(db): State<DatabaseConnection>,
    _claims: Claims,
    Path(category_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let fields = product_service::category_fields(&db, category_id).await?;
    Ok(Json(json!({ "success": true, "fields": fields })))
}
