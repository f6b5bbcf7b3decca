use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;

use super::error::ApiResult;
use crate::auth::Claims;
use crate::services::Actor;
use crate::services::product_type_service::{self, CustomDataInput, ProductTypeInput};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub active: bool,
}

pub async fn list_types(
    State(db): State<DatabaseConnection>,
    _claims: Claims,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let types = product_type_service::list_types(&db, query.active).await?;
    Ok(Json(json!({ "total": types.len(), "product_types": types })))
}

pub async fn create_type(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(input): Json<ProductTypeInput>,
) -> ApiResult<impl IntoResponse> {
    let created = product_type_service::create_type(&db, input, &Actor::from(&claims)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "product_type": created })),
    ))
}

pub async fn get_type(
    State(db): State<DatabaseConnection>,
    _claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(product_type_service::get_type(&db, id).await?))
}

pub async fn update_type(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(input): Json<ProductTypeInput>,
) -> ApiResult<impl IntoResponse> {
    let updated = product_type_service::update_type(&db, id, input, &Actor::from(&claims)).await?;
    Ok(Json(json!({ "success": true, "product_type": updated })))
}

pub async fn delete_type(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    product_type_service::delete_type(&db, id, &Actor::from(&claims)).await?;
    Ok(Json(json!({ "success": true, "message": "Product type deleted" })))
}

#[derive(Debug, Deserialize)]
pub struct DetectQuery {
    pub category_id: i32,
}

pub async fn detect_type(
    State(db): State<DatabaseConnection>,
    _claims: Claims,
    Query(query): Query<DetectQuery>,
) -> ApiResult<impl IntoResponse> {
    let found = product_type_service::detect_for_category(&db, query.category_id).await?;
    Ok(Json(json!({
        "success": found.is_some(),
        "product_type": found,
    })))
}

pub async fn next_serial(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let serial = product_type_service::next_serial(&db, id).await?;
    tracing::info!(user = %claims.sub, action = "SERIAL_RESERVED", serial = %serial);
    Ok(Json(json!({ "success": true, "serial_number": serial })))
}

pub async fn get_custom_data(
    State(db): State<DatabaseConnection>,
    _claims: Claims,
    Path(product_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let data = product_type_service::get_custom_data(&db, product_id).await?;
    Ok(Json(json!({ "success": true, "custom_data": data })))
}

pub async fn save_custom_data(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(product_id): Path<i32>,
    Json(input): Json<CustomDataInput>,
) -> ApiResult<impl IntoResponse> {
    let saved =
        product_type_service::save_custom_data(&db, product_id, input, &Actor::from(&claims))
            .await?;
    Ok(Json(json!({ "success": true, "custom_data": saved })))
}
