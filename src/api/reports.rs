use axum::{
    Json,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;

use super::error::ApiResult;
use crate::auth::Claims;
use crate::services::Actor;
use crate::services::report_service::{self, ExportFormat, ExportKind};
use crate::utils::dates::today;

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses((status = 200, description = "Inventory overview"))
)]
pub async fn dashboard(
    State(db): State<DatabaseConnection>,
    claims: Claims,
) -> ApiResult<impl IntoResponse> {
    let dashboard = report_service::dashboard(&db, today()).await?;
    tracing::debug!(user = %claims.sub, "dashboard served");
    Ok(Json(dashboard))
}

pub async fn inventory_report(
    State(db): State<DatabaseConnection>,
    claims: Claims,
) -> ApiResult<impl IntoResponse> {
    let report = report_service::inventory_report(&db, today()).await?;
    tracing::info!(user = %claims.sub, action = "INVENTORY_REPORT");
    Ok(Json(report))
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default, rename = "type")]
    pub kind: ExportKind,
    #[serde(default)]
    pub format: ExportFormat,
}

/// `GET /export?type=products|assignments&format=csv|json`
pub async fn export(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Query(query): Query<ExportQuery>,
) -> ApiResult<impl IntoResponse> {
    let export = report_service::export(&db, query.kind, query.format).await?;
    tracing::info!(user = %claims.sub, action = "DATA_EXPORTED", file = %export.filename);

    Ok((
        [
            (header::CONTENT_TYPE, export.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export.filename),
            ),
        ],
        export.body,
    ))
}

pub async fn backup(
    State(db): State<DatabaseConnection>,
    claims: Claims,
) -> ApiResult<impl IntoResponse> {
    let snapshot = report_service::backup(&db, &Actor::from(&claims)).await?;
    let filename = format!(
        "backup_{}.json",
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    );
    Ok((
        [(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )],
        Json(snapshot),
    ))
}
