use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;

use super::error::ApiResult;
use crate::auth::Claims;
use crate::services::movement_service::{self, MovementFilter};

#[utoipa::path(
    get,
    path = "/api/movements",
    responses((status = 200, description = "Latest stock movements with totals"))
)]
pub async fn list_movements(
    State(db): State<DatabaseConnection>,
    _claims: Claims,
    Query(filter): Query<MovementFilter>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(movement_service::list_movements(&db, filter).await?))
}
