use axum::{
    Json,
    extract::{Path, Query, State},
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
use crate::services::assignment_service::{
    self, AssignmentFilter, CreateAssignmentInput, ReturnInput,
};
use crate::utils::dates::{parse_date, today};

#[utoipa::path(
    get,
    path = "/api/assignments",
    responses((status = 200, description = "Assignments with open/returned totals"))
)]
pub async fn list_assignments(
    State(db): State<DatabaseConnection>,
    _claims: Claims,
    Query(filter): Query<AssignmentFilter>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(assignment_service::list_assignments(&db, filter).await?))
}

#[utoipa::path(
    post,
    path = "/api/assignments",
    responses(
        (status = 201, description = "Asset handed over"),
        (status = 409, description = "Asset not available or already assigned")
    )
)]
pub async fn create_assignment(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Json(input): Json<CreateAssignmentInput>,
) -> ApiResult<impl IntoResponse> {
    let assignment =
        assignment_service::create_assignment(&db, input, &Actor::from(&claims)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Assignment registered",
            "assignment": assignment,
        })),
    ))
}

pub async fn get_assignment(
    State(db): State<DatabaseConnection>,
    _claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(assignment_service::get_assignment(&db, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/assignments/{id}/return",
    params(("id" = i32, Path, description = "Assignment id")),
    responses(
        (status = 200, description = "Assignment closed"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_assignment(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(input): Json<ReturnInput>,
) -> ApiResult<impl IntoResponse> {
    let assignment =
        assignment_service::return_assignment(&db, id, input, &Actor::from(&claims)).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Return registered",
        "assignment": assignment,
    })))
}

pub async fn confirm_assignment(
    State(db): State<DatabaseConnection>,
    claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let assignment =
        assignment_service::confirm_assignment(&db, id, &Actor::from(&claims)).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Assignment confirmed",
        "assignment": assignment,
    })))
}

/// The assignment report as a two-column CSV
pub async fn assignment_report(
    State(db): State<DatabaseConnection>,
    _claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let rows = assignment_service::assignment_report(&db, id).await?;
    let body = assignment_service::report_csv(&rows)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"assignment_{}.csv\"", id),
            ),
        ],
        body,
    ))
}

#[derive(Debug, Deserialize)]
pub struct ReminderRequest {
    pub assignment_id: i32,
}

pub async fn send_reminder(
    State(state): State<AppState>,
    claims: Claims,
    Json(request): Json<ReminderRequest>,
) -> ApiResult<impl IntoResponse> {
    let mail = assignment_service::send_reminder(
        state.db(),
        state.mailer.as_ref(),
        request.assignment_id,
        &Actor::from(&claims),
    )
    .await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Reminder sent to {}", mail.to),
    })))
}

#[derive(Debug, Deserialize)]
pub struct OverdueQuery {
    /// Reference date, defaults to today
    pub on: Option<String>,
}

pub async fn overdue_loans(
    State(db): State<DatabaseConnection>,
    _claims: Claims,
    Query(query): Query<OverdueQuery>,
) -> ApiResult<impl IntoResponse> {
    let on = match query.on.as_deref().filter(|d| !d.is_empty()) {
        Some(raw) => parse_date(raw, "Date")?,
        None => today(),
    };
    let loans = assignment_service::overdue_loans(&db, on).await?;
    Ok(Json(json!({ "total": loans.len(), "loans": loans })))
}

pub async fn department_employees(
    State(db): State<DatabaseConnection>,
    _claims: Claims,
    Path(department_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let employees = assignment_service::employees_for_department(&db, department_id).await?;
    Ok(Json(json!({ "success": true, "employees": employees })))
}
