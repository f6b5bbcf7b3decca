use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;

use super::error::ApiResult;
use crate::auth::Claims;
use crate::infrastructure::AppState;
use crate::services::Actor;
use crate::services::sticker_service;

#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    /// Wire values such as `QR` or `ETIQUETA_COMPLETA`; empty means QR only
    #[serde(default)]
    pub kinds: Vec<String>,
}

pub async fn list_stickers(
    State(db): State<DatabaseConnection>,
    _claims: Claims,
    Path(product_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let stickers = sticker_service::list_for_product(&db, product_id).await?;
    Ok(Json(json!({ "total": stickers.len(), "stickers": stickers })))
}

#[utoipa::path(
    post,
    path = "/api/products/{id}/stickers",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 201, description = "Stickers rendered and stored"),
        (status = 404, description = "Product not found")
    )
)]
pub async fn generate_stickers(
    State(state): State<AppState>,
    claims: Claims,
    Path(product_id): Path<i32>,
    payload: Option<Json<GenerateRequest>>,
) -> ApiResult<impl IntoResponse> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let stickers = sticker_service::generate(
        state.db(),
        state.renderer.as_ref(),
        &state.config.media_root,
        product_id,
        &request.kinds,
        &Actor::from(&claims),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": format!("{} sticker(s) generated", stickers.len()),
            "stickers": stickers,
        })),
    ))
}

pub async fn print_sticker(
    State(state): State<AppState>,
    _claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let printable = sticker_service::printable(
        state.db(),
        state.renderer.as_ref(),
        &state.config.media_root,
        id,
    )
    .await?;
    Ok(Json(printable))
}

pub async fn download_sticker(
    State(state): State<AppState>,
    _claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let (filename, png) = sticker_service::download(
        state.db(),
        state.renderer.as_ref(),
        &state.config.media_root,
        id,
    )
    .await?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        png,
    ))
}

pub async fn mark_printed(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let sticker = sticker_service::mark_printed(&db, id, &Actor::from(&claims)).await?;
    Ok(Json(json!({ "success": true, "sticker": sticker })))
}

pub async fn delete_sticker(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    sticker_service::delete(state.db(), &state.config.media_root, id, &Actor::from(&claims)).await?;
    Ok(Json(json!({ "success": true, "message": "Sticker deleted" })))
}
