//! Assignment Service - hand-over and return of assets
//!
//! Creating and returning assignments are the only operations that move an
//! asset through its lifecycle. Both run in a transaction and guard the state
//! flip with a conditional update, so two concurrent submissions for the same
//! asset cannot both succeed.

use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

use super::movement_service::{self, NewMovement};
use super::product_service::open_assignment;
use super::{Actor, Mailer, OutgoingMail};
use crate::domain::{DomainError, LifecycleEvent};
use crate::models::assignment::{self, AssignmentKind, Entity as Assignment, ReturnReason};
use crate::models::product::{self, AssetState, Entity as Product};
use crate::models::{department, employee, parse_vocab, stock_movement, MovementKind};
use crate::utils::dates::{now_rfc3339, parse_date, start_of_day, stored_date, stored_instant, today};

const WAREHOUSE: &str = "Almacén";
const WORKSHOP: &str = "Taller";

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAssignmentInput {
    pub product_id: i32,
    pub department_id: i32,
    pub employee_id: Option<i32>,
    /// Wire value, e.g. `ENTREGA`
    pub kind: String,
    /// `YYYY-MM-DD`, not in the future
    pub delivered_on: String,
    pub expected_return_on: Option<String>,
    pub delivery_notes: Option<String>,
    pub delivery_document: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReturnInput {
    /// `YYYY-MM-DD`, not before the delivery date
    pub returned_on: String,
    /// Free text, trimmed; exactly `AVERIADO` or `MANTENIMIENTO` keeps the asset out of stock
    pub condition: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub document: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct AssignmentFilter {
    pub search: Option<String>,
    pub department_id: Option<i32>,
    pub kind: Option<String>,
    /// `open` or `returned`
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AssignmentRow {
    #[serde(flatten)]
    pub assignment: assignment::Model,
    pub product_internal_id: Option<String>,
    pub product_serial_number: Option<String>,
    pub product_model: Option<String>,
    pub employee_name: Option<String>,
    pub department_name: Option<String>,
    pub pending: bool,
    pub days_in_possession: i64,
    pub loan_overdue: bool,
}

#[derive(Debug, Serialize)]
pub struct AssignmentList {
    pub assignments: Vec<AssignmentRow>,
    pub total: u64,
    pub open: u64,
    pub returned: u64,
}

#[derive(Debug, Serialize)]
pub struct AssignmentDetail {
    #[serde(flatten)]
    pub row: AssignmentRow,
    pub product_state: Option<AssetState>,
    pub movements: Vec<stock_movement::Model>,
}

#[derive(Debug, Serialize, FromQueryResult)]
pub struct EmployeeBrief {
    pub id: i32,
    pub name: String,
    pub national_id: String,
    pub position: Option<String>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn days_in_possession(a: &assignment::Model) -> i64 {
    let Some(start) = stored_instant(&a.delivered_at) else {
        return 0;
    };
    let end = a
        .returned_at
        .as_deref()
        .and_then(stored_instant)
        .unwrap_or_else(Utc::now);
    (end - start).num_days().max(0)
}

fn loan_overdue(a: &assignment::Model, on: NaiveDate) -> bool {
    a.kind == AssignmentKind::Loan
        && a.is_pending()
        && a.expected_return_on
            .as_deref()
            .and_then(stored_date)
            .is_some_and(|due| on > due)
}

/// Attach product, employee and department names to a batch of assignments
pub(crate) async fn enrich(
    db: &DatabaseConnection,
    assignments: Vec<assignment::Model>,
) -> Result<Vec<AssignmentRow>, DomainError> {
    let product_ids: Vec<i32> = assignments.iter().map(|a| a.product_id).collect();
    let employee_ids: Vec<i32> = assignments.iter().filter_map(|a| a.employee_id).collect();
    let department_ids: Vec<i32> = assignments.iter().map(|a| a.department_id).collect();

    let products: HashMap<i32, product::Model> = if product_ids.is_empty() {
        HashMap::new()
    } else {
        Product::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect()
    };
    let employees: HashMap<i32, String> = if employee_ids.is_empty() {
        HashMap::new()
    } else {
        employee::Entity::find()
            .filter(employee::Column::Id.is_in(employee_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|e| (e.id, e.name))
            .collect()
    };
    let departments: HashMap<i32, String> = if department_ids.is_empty() {
        HashMap::new()
    } else {
        department::Entity::find()
            .filter(department::Column::Id.is_in(department_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|d| (d.id, d.name))
            .collect()
    };

    let on = today();
    Ok(assignments
        .into_iter()
        .map(|a| {
            let product = products.get(&a.product_id);
            AssignmentRow {
                product_internal_id: product.map(|p| p.internal_id.clone()),
                product_serial_number: product.map(|p| p.serial_number.clone()),
                product_model: product.map(|p| p.model.clone()),
                employee_name: a.employee_id.and_then(|id| employees.get(&id).cloned()),
                department_name: departments.get(&a.department_id).cloned(),
                pending: a.is_pending(),
                days_in_possession: days_in_possession(&a),
                loan_overdue: loan_overdue(&a, on),
                assignment: a,
            }
        })
        .collect())
}

async fn find_active(db: &DatabaseConnection, id: i32) -> Result<assignment::Model, DomainError> {
    Assignment::find_by_id(id)
        .filter(assignment::Column::Active.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Assignment"))
}

/// Hand an asset over to a department (and optionally one of its employees)
pub async fn create_assignment(
    db: &DatabaseConnection,
    input: CreateAssignmentInput,
    actor: &Actor,
) -> Result<assignment::Model, DomainError> {
    let kind = parse_vocab::<AssignmentKind>(&input.kind)
        .ok_or_else(|| DomainError::Validation("Invalid assignment kind".to_string()))?;

    let delivered_on = parse_date(&input.delivered_on, "Delivery date")?;
    if delivered_on > today() {
        return Err(DomainError::Validation(
            "The delivery date cannot be in the future".to_string(),
        ));
    }
    let expected_return_on = trimmed(input.expected_return_on)
        .map(|d| parse_date(&d, "Expected return date"))
        .transpose()?;
    if let Some(expected) = expected_return_on {
        if expected < delivered_on {
            return Err(DomainError::Validation(
                "The expected return date cannot be before the delivery date".to_string(),
            ));
        }
    }

    let product = Product::find_by_id(input.product_id)
        .filter(product::Column::Active.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Product"))?;
    let department = department::Entity::find_by_id(input.department_id)
        .filter(department::Column::Active.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Department"))?;

    let employee = match input.employee_id {
        Some(eid) => {
            let employee = employee::Entity::find_by_id(eid)
                .filter(employee::Column::Active.eq(true))
                .one(db)
                .await?
                .ok_or_else(|| DomainError::not_found("Employee"))?;
            if employee.department_id != department.id {
                return Err(DomainError::BusinessRule(
                    "The employee does not belong to the selected department".to_string(),
                ));
            }
            Some(employee)
        }
        None => None,
    };

    let event = LifecycleEvent::for_assignment(kind);
    let next_state = product.state.apply(&event).map_err(|_| {
        DomainError::BusinessRule(format!(
            "Product '{}' is not available for assignment",
            product.serial_number
        ))
    })?;

    if open_assignment(db, product.id).await?.is_some() {
        return Err(DomainError::BusinessRule(
            "The product already has an open assignment".to_string(),
        ));
    }

    let now = now_rfc3339();
    let txn = db.begin().await?;

    if open_assignment(&txn, product.id).await?.is_some() {
        txn.rollback().await?;
        return Err(DomainError::BusinessRule(
            "The product already has an open assignment".to_string(),
        ));
    }

    let saved = assignment::ActiveModel {
        product_id: Set(product.id),
        employee_id: Set(employee.as_ref().map(|e| e.id)),
        department_id: Set(department.id),
        kind: Set(kind),
        delivered_at: Set(start_of_day(delivered_on)),
        returned_at: Set(None),
        expected_return_on: Set(expected_return_on.map(|d| d.format("%Y-%m-%d").to_string())),
        return_reason: Set(None),
        delivery_notes: Set(trimmed(input.delivery_notes)),
        return_notes: Set(None),
        delivered_by: Set(actor.user_id),
        returned_by: Set(None),
        delivery_document: Set(trimmed(input.delivery_document)),
        return_document: Set(None),
        condition_on_delivery: Set(product.condition.to_value()),
        condition_on_return: Set(None),
        confirmed_by_employee: Set(false),
        confirmed_at: Set(None),
        active: Set(true),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    // Only flips if nobody else moved the asset since we read it
    let flipped = Product::update_many()
        .col_expr(product::Column::State, Expr::value(next_state))
        .col_expr(product::Column::UpdatedAt, Expr::value(now))
        .filter(product::Column::Id.eq(product.id))
        .filter(product::Column::State.eq(AssetState::Available))
        .exec(&txn)
        .await?;

    if flipped.rows_affected == 0 {
        txn.rollback().await?;
        tracing::warn!(product_id = product.id, "concurrent assignment rejected");
        return Err(DomainError::BusinessRule(format!(
            "Product '{}' is not available for assignment",
            product.serial_number
        )));
    }

    txn.commit().await?;

    tracing::info!(
        user = %actor.username,
        action = "ASSIGNMENT_CREATED",
        serial = %product.serial_number,
        employee = employee.as_ref().map(|e| e.name.as_str()).unwrap_or("-"),
        department = %department.name,
    );
    Ok(saved)
}

pub async fn list_assignments(
    db: &DatabaseConnection,
    filter: AssignmentFilter,
) -> Result<AssignmentList, DomainError> {
    let mut condition = Condition::all().add(assignment::Column::Active.eq(true));

    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        condition = condition.add(
            Condition::any()
                .add(product::Column::InternalId.contains(search))
                .add(product::Column::SerialNumber.contains(search))
                .add(product::Column::Model.contains(search))
                .add(employee::Column::Name.contains(search))
                .add(department::Column::Name.contains(search)),
        );
    }
    if let Some(department_id) = filter.department_id {
        condition = condition.add(assignment::Column::DepartmentId.eq(department_id));
    }
    if let Some(kind) = filter.kind.as_deref().filter(|k| !k.is_empty()) {
        match parse_vocab::<AssignmentKind>(kind) {
            Some(kind) => condition = condition.add(assignment::Column::Kind.eq(kind)),
            None => tracing::warn!(kind, "ignoring unknown assignment kind filter"),
        }
    }
    match filter.status.as_deref() {
        Some("open") => condition = condition.add(assignment::Column::ReturnedAt.is_null()),
        Some("returned") => condition = condition.add(assignment::Column::ReturnedAt.is_not_null()),
        _ => {}
    }

    let assignments = Assignment::find()
        .join(JoinType::LeftJoin, assignment::Relation::Product.def())
        .join(JoinType::LeftJoin, assignment::Relation::Employee.def())
        .join(JoinType::LeftJoin, assignment::Relation::Department.def())
        .filter(condition)
        .order_by_desc(assignment::Column::DeliveredAt)
        .order_by_desc(assignment::Column::Id)
        .all(db)
        .await?;

    let base = Assignment::find().filter(assignment::Column::Active.eq(true));
    let total = base.clone().count(db).await?;
    let open = base
        .clone()
        .filter(assignment::Column::ReturnedAt.is_null())
        .count(db)
        .await?;

    Ok(AssignmentList {
        assignments: enrich(db, assignments).await?,
        total,
        open,
        returned: total - open,
    })
}

pub async fn get_assignment(db: &DatabaseConnection, id: i32) -> Result<AssignmentDetail, DomainError> {
    let assignment = find_active(db, id).await?;
    let product_id = assignment.product_id;

    let product_state = Product::find_by_id(product_id)
        .one(db)
        .await?
        .map(|p| p.state);
    let movements = movement_service::for_product(db, product_id, 20).await?;

    let row = enrich(db, vec![assignment])
        .await?
        .pop()
        .ok_or_else(|| DomainError::not_found("Assignment"))?;

    Ok(AssignmentDetail {
        row,
        product_state,
        movements,
    })
}

/// Close an open assignment and move the asset to the state the reported condition implies
pub async fn return_assignment(
    db: &DatabaseConnection,
    id: i32,
    input: ReturnInput,
    actor: &Actor,
) -> Result<assignment::Model, DomainError> {
    let existing = find_active(db, id).await?;
    if !existing.is_pending() {
        return Err(DomainError::BusinessRule(
            "This assignment has already been returned".to_string(),
        ));
    }

    let condition = input.condition.trim().to_string();
    if input.returned_on.trim().is_empty() || condition.is_empty() {
        return Err(DomainError::Validation(
            "Return date and product condition are required".to_string(),
        ));
    }
    let returned_on = parse_date(&input.returned_on, "Return date")?;
    let returned_at = start_of_day(returned_on);
    let delivered = stored_instant(&existing.delivered_at)
        .ok_or_else(|| DomainError::Internal("Stored delivery date is unreadable".to_string()))?;
    let returned = stored_instant(&returned_at)
        .ok_or_else(|| DomainError::Internal("Return date could not be stored".to_string()))?;
    if returned < delivered {
        return Err(DomainError::Validation(
            "The return date cannot be before the delivery date".to_string(),
        ));
    }

    let reason = match trimmed(input.reason) {
        Some(raw) => Some(
            parse_vocab::<ReturnReason>(&raw)
                .ok_or_else(|| DomainError::Validation("Invalid return reason".to_string()))?,
        ),
        None => None,
    };

    let product = Product::find_by_id(existing.product_id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Product"))?;
    let next_state = product
        .state
        .apply(&LifecycleEvent::Return(condition.clone()))
        .map_err(|e| DomainError::BusinessRule(e.to_string()))?;

    let department_name = department::Entity::find_by_id(existing.department_id)
        .one(db)
        .await?
        .map(|d| d.name);
    let employee_name = match existing.employee_id {
        Some(eid) => employee::Entity::find_by_id(eid).one(db).await?.map(|e| e.name),
        None => None,
    };

    let now = now_rfc3339();
    let txn = db.begin().await?;

    let closed = Assignment::update_many()
        .col_expr(assignment::Column::ReturnedAt, Expr::value(returned_at))
        .col_expr(assignment::Column::ReturnedBy, Expr::value(actor.user_id))
        .col_expr(assignment::Column::ReturnReason, Expr::value(reason))
        .col_expr(assignment::Column::ReturnNotes, Expr::value(trimmed(input.notes)))
        .col_expr(assignment::Column::ReturnDocument, Expr::value(trimmed(input.document)))
        .col_expr(assignment::Column::ConditionOnReturn, Expr::value(condition.clone()))
        .col_expr(assignment::Column::UpdatedAt, Expr::value(now.clone()))
        .filter(assignment::Column::Id.eq(existing.id))
        .filter(assignment::Column::ReturnedAt.is_null())
        .exec(&txn)
        .await?;

    if closed.rows_affected == 0 {
        txn.rollback().await?;
        return Err(DomainError::BusinessRule(
            "This assignment has already been returned".to_string(),
        ));
    }

    Product::update_many()
        .col_expr(product::Column::State, Expr::value(next_state))
        .col_expr(product::Column::UpdatedAt, Expr::value(now))
        .filter(product::Column::Id.eq(product.id))
        .exec(&txn)
        .await?;

    let out_of_service = matches!(next_state, AssetState::Faulty | AssetState::Maintenance);
    movement_service::record(
        &txn,
        NewMovement::new(
            product.id,
            if out_of_service {
                MovementKind::Repair
            } else {
                MovementKind::Transfer
            },
            actor.user_id,
            format!(
                "Returned by {}",
                employee_name.as_deref().unwrap_or("N/A")
            ),
        )
        .route(
            department_name,
            Some(
                if next_state == AssetState::Available {
                    WAREHOUSE
                } else {
                    WORKSHOP
                }
                .to_string(),
            ),
        )
        .values(
            json!({ "state": product.state }),
            json!({ "state": next_state, "condition": condition }),
        ),
    )
    .await?;

    txn.commit().await?;

    tracing::info!(
        user = %actor.username,
        action = "ASSIGNMENT_RETURNED",
        serial = %product.serial_number,
        state = next_state.wire(),
    );

    find_active(db, id).await
}

/// The employee acknowledges receipt
pub async fn confirm_assignment(
    db: &DatabaseConnection,
    id: i32,
    actor: &Actor,
) -> Result<assignment::Model, DomainError> {
    let existing = find_active(db, id).await?;

    if existing.confirmed_by_employee {
        return Err(DomainError::BusinessRule(
            "This assignment has already been confirmed".to_string(),
        ));
    }
    if !existing.is_pending() {
        return Err(DomainError::BusinessRule(
            "A returned assignment cannot be confirmed".to_string(),
        ));
    }

    let now = now_rfc3339();
    let mut active: assignment::ActiveModel = existing.into();
    active.confirmed_by_employee = Set(true);
    active.confirmed_at = Set(Some(now.clone()));
    active.updated_at = Set(now);
    let saved = active.update(db).await?;

    tracing::info!(user = %actor.username, action = "ASSIGNMENT_CONFIRMED", assignment_id = saved.id);
    Ok(saved)
}

pub async fn employees_for_department(
    db: &DatabaseConnection,
    department_id: i32,
) -> Result<Vec<EmployeeBrief>, DomainError> {
    department::Entity::find_by_id(department_id)
        .filter(department::Column::Active.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Department"))?;

    Ok(employee::Entity::find()
        .select_only()
        .column(employee::Column::Id)
        .column(employee::Column::Name)
        .column(employee::Column::NationalId)
        .column(employee::Column::Position)
        .filter(employee::Column::DepartmentId.eq(department_id))
        .filter(employee::Column::Active.eq(true))
        .order_by_asc(employee::Column::Name)
        .into_model::<EmployeeBrief>()
        .all(db)
        .await?)
}

fn display_date(stored: &str) -> String {
    stored_date(stored)
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Ask the recipient of an open assignment to return or confirm it
pub async fn send_reminder(
    db: &DatabaseConnection,
    mailer: &dyn Mailer,
    id: i32,
    actor: &Actor,
) -> Result<OutgoingMail, DomainError> {
    let assignment = find_active(db, id).await?;
    if !assignment.is_pending() {
        return Err(DomainError::BusinessRule(
            "This assignment has already been returned".to_string(),
        ));
    }

    let employee = match assignment.employee_id {
        Some(eid) => employee::Entity::find_by_id(eid).one(db).await?,
        None => None,
    }
    .filter(|e| !e.email.trim().is_empty())
    .ok_or_else(|| {
        DomainError::BusinessRule("The employee has no registered e-mail".to_string())
    })?;

    let product = Product::find_by_id(assignment.product_id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Product"))?;

    let mut body = format!(
        "Hello {},\n\nOur records show that you hold {} {} (serial {}) since {}.\n",
        employee.name,
        product.internal_id,
        product.model,
        product.serial_number,
        display_date(&assignment.delivered_at),
    );
    if let Some(due) = &assignment.expected_return_on {
        body.push_str(&format!("It was due back on {}.\n", display_date(due)));
    }
    if !assignment.confirmed_by_employee {
        body.push_str("Please confirm that you received it.\n");
    }
    body.push_str("\nThank you.\n");

    let mail = OutgoingMail {
        to: employee.email.clone(),
        subject: "Asset assignment reminder".to_string(),
        body,
    };
    mailer.send(mail.clone()).await?;

    tracing::info!(user = %actor.username, action = "REMINDER_SENT", assignment_id = assignment.id, to = %employee.name);
    Ok(mail)
}

/// Open loans whose expected return date is before `on`
pub async fn overdue_loans(
    db: &DatabaseConnection,
    on: NaiveDate,
) -> Result<Vec<AssignmentRow>, DomainError> {
    let loans = Assignment::find()
        .filter(assignment::Column::Active.eq(true))
        .filter(assignment::Column::Kind.eq(AssignmentKind::Loan))
        .filter(assignment::Column::ReturnedAt.is_null())
        .filter(assignment::Column::ExpectedReturnOn.is_not_null())
        .filter(assignment::Column::ExpectedReturnOn.lt(on.format("%Y-%m-%d").to_string()))
        .order_by_asc(assignment::Column::ExpectedReturnOn)
        .all(db)
        .await?;

    enrich(db, loans).await
}

/// Label/value pairs describing one assignment, in report order
pub async fn assignment_report(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Vec<(String, String)>, DomainError> {
    let assignment = find_active(db, id).await?;

    let product = Product::find_by_id(assignment.product_id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Product"))?;
    let employee = match assignment.employee_id {
        Some(eid) => employee::Entity::find_by_id(eid).one(db).await?.map(|e| e.name),
        None => None,
    };
    let department = department::Entity::find_by_id(assignment.department_id)
        .one(db)
        .await?
        .map(|d| d.name);

    let dash = || "-".to_string();
    Ok(vec![
        ("ID".into(), assignment.id.to_string()),
        (
            "Product".into(),
            format!("{} - {} ({})", product.internal_id, product.model, product.serial_number),
        ),
        ("Employee".into(), employee.unwrap_or_else(dash)),
        ("Department".into(), department.unwrap_or_else(dash)),
        ("Kind".into(), assignment.kind.to_value()),
        ("Delivery date".into(), display_date(&assignment.delivered_at)),
        (
            "Return date".into(),
            assignment
                .returned_at
                .as_deref()
                .map(display_date)
                .unwrap_or_else(dash),
        ),
        (
            "Delivery notes".into(),
            assignment.delivery_notes.unwrap_or_else(dash),
        ),
        (
            "Return notes".into(),
            assignment.return_notes.unwrap_or_else(dash),
        ),
        (
            "Condition on delivery".into(),
            assignment.condition_on_delivery,
        ),
        (
            "Condition on return".into(),
            assignment.condition_on_return.unwrap_or_else(dash),
        ),
        (
            "Return reason".into(),
            assignment
                .return_reason
                .map(|r| r.to_value())
                .unwrap_or_else(dash),
        ),
        (
            "Confirmed by employee".into(),
            if assignment.confirmed_by_employee { "Yes" } else { "No" }.to_string(),
        ),
    ])
}

/// Two-column CSV rendering of [`assignment_report`]
pub fn report_csv(rows: &[(String, String)]) -> Result<Vec<u8>, DomainError> {
    let csv_err = |e: csv::Error| DomainError::Internal(format!("CSV export failed: {}", e));

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Field", "Value"]).map_err(csv_err)?;
    for (label, value) in rows {
        writer.write_record([label, value]).map_err(csv_err)?;
    }
    writer
        .into_inner()
        .map_err(|e| DomainError::Internal(format!("CSV export failed: {}", e)))
}
