//! Master-data handlers, generic over [`CatalogRepository`].
//!
//! One set of handlers serves categories, brands, suppliers, departments,
//! employees and locations; the router instantiates them per repository.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::error::ApiResult;
use crate::auth::Claims;
use crate::domain::{CatalogRepository, DomainError};
use crate::services::Actor;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Only active records
    #[serde(default)]
    pub active: bool,
}

pub async fn list<R: CatalogRepository>(
    State(repo): State<Arc<R>>,
    _claims: Claims,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let items = repo.list(query.active).await?;
    Ok(Json(json!({ "total": items.len(), "items": items })))
}

pub async fn get<R: CatalogRepository>(
    State(repo): State<Arc<R>>,
    _claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let item = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found(R::NAME))?;
    Ok(Json(json!({ "item": item })))
}

pub async fn create<R: CatalogRepository>(
    State(repo): State<Arc<R>>,
    claims: Claims,
    Json(input): Json<R::Input>,
) -> ApiResult<impl IntoResponse> {
    let item = repo.create(input, claims.uid).await?;
    tracing::info!(user = %claims.sub, action = "CATALOG_CREATED", kind = R::NAME);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": format!("{} created", R::NAME),
            "item": item,
        })),
    ))
}

pub async fn update<R: CatalogRepository>(
    State(repo): State<Arc<R>>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(input): Json<R::Input>,
) -> ApiResult<impl IntoResponse> {
    let item = repo.update(id, input).await?;
    tracing::info!(user = %claims.sub, action = "CATALOG_UPDATED", kind = R::NAME, id);
    Ok(Json(json!({
        "success": true,
        "message": format!("{} updated", R::NAME),
        "item": item,
    })))
}

pub async fn toggle<R: CatalogRepository>(
    State(repo): State<Arc<R>>,
    claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let item = repo.toggle_active(id).await?;
    tracing::info!(user = %claims.sub, action = "CATALOG_TOGGLED", kind = R::NAME, id);
    Ok(Json(json!({ "success": true, "item": item })))
}

/// Admin only; refused while other rows reference the record
pub async fn delete<R: CatalogRepository>(
    State(repo): State<Arc<R>>,
    claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    Actor::from(&claims).require_admin("delete master data")?;
    repo.delete(id).await?;
    tracing::info!(user = %claims.sub, action = "CATALOG_DELETED", kind = R::NAME, id);
    Ok(Json(json!({
        "success": true,
        "message": format!("{} deleted", R::NAME),
    })))
}
