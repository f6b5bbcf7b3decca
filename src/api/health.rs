use axum::{Json, extract::State};
use sea_orm::{ConnectionTrait, DatabaseConnection};
use serde_json::{Value, json};

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
pub async fn health_check(State(db): State<DatabaseConnection>) -> Json<Value> {
    let database = match db.execute_unprepared("SELECT 1").await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "health check could not reach the database");
            "unavailable"
        }
    };

    Json(json!({
        "status": "ok",
        "service": "assetdesk",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
    }))
}
