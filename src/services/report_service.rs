//! Report Service - dashboard figures, inventory report, exports and backups

use chrono::{Duration, NaiveDate};
use sea_orm::*;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};

use super::Actor;
use super::assignment_service::{AssignmentRow, enrich};
use crate::domain::DomainError;
use crate::models::assignment::{self, AssignmentKind, Entity as Assignment};
use crate::models::product::{self, AssetState, Entity as Product};
use crate::models::{
    brand, category, custom_data, department, employee, location, product_type,
    product_type_category, supplier,
};
use crate::utils::dates::{now_rfc3339, start_of_day};

const TOP_N: usize = 10;
const WINDOW_DAYS: i64 = 30;

#[derive(Debug, Serialize)]
pub struct Holding {
    pub id: i32,
    pub name: String,
    pub open: u64,
}

#[derive(Debug, Serialize)]
pub struct CategoryTotals {
    pub id: i32,
    pub name: String,
    pub total: u64,
    pub available: u64,
    pub delivered: u64,
}

#[derive(Debug, Serialize)]
pub struct WarrantyRow {
    pub id: i32,
    pub internal_id: String,
    pub serial_number: String,
    pub model: String,
    pub warranty_ends_on: String,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub total_products: u64,
    pub available: u64,
    pub delivered: u64,
    pub faulty: u64,
    pub by_state: BTreeMap<String, u64>,
    pub departments: u64,
    pub employees: u64,
    pub top_departments: Vec<Holding>,
    pub top_employees: Vec<Holding>,
    pub categories: Vec<CategoryTotals>,
    pub recent_assignments: u64,
    pub warranties_ending: Vec<WarrantyRow>,
    pub unconfirmed: Vec<AssignmentRow>,
}

#[derive(Debug, Serialize)]
pub struct InventoryReport {
    pub generated_at: String,
    pub total_products: u64,
    /// Keyed by the stored value, so unexpected states show up as-is
    pub by_state: BTreeMap<String, u64>,
    pub by_category: Vec<CategoryTotals>,
    pub by_department: Vec<Holding>,
    pub total_value: f64,
    pub average_price: f64,
    pub warranties_ending: Vec<WarrantyRow>,
    pub recent_deliveries: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    #[default]
    Products,
    Assignments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Debug)]
pub struct Export {
    pub filename: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

#[derive(Debug, Serialize)]
struct ProductExportRow {
    #[serde(rename = "Internal id")]
    internal_id: String,
    #[serde(rename = "Serial number")]
    serial_number: String,
    #[serde(rename = "Category")]
    category: String,
    #[serde(rename = "Brand")]
    brand: String,
    #[serde(rename = "Model")]
    model: String,
    #[serde(rename = "State")]
    state: String,
    #[serde(rename = "Condition")]
    condition: String,
    #[serde(rename = "Purchase price")]
    purchase_price: f64,
    #[serde(rename = "Purchased on")]
    purchased_on: String,
    #[serde(rename = "Supplier")]
    supplier: Option<String>,
    #[serde(rename = "Location")]
    location: Option<String>,
    #[serde(rename = "Warranty until")]
    warranty_ends_on: Option<String>,
}

#[derive(Debug, Serialize)]
struct AssignmentExportRow {
    #[serde(rename = "Product")]
    product: String,
    #[serde(rename = "Serial number")]
    serial_number: String,
    #[serde(rename = "Employee")]
    employee: Option<String>,
    #[serde(rename = "Department")]
    department: String,
    #[serde(rename = "Kind")]
    kind: String,
    #[serde(rename = "Delivered at")]
    delivered_at: String,
    #[serde(rename = "Returned at")]
    returned_at: Option<String>,
    #[serde(rename = "Status")]
    status: &'static str,
    #[serde(rename = "Notes")]
    notes: Option<String>,
}

fn names<I>(rows: I) -> HashMap<i32, String>
where
    I: IntoIterator<Item = (i32, String)>,
{
    rows.into_iter().collect()
}

fn rank(counts: HashMap<i32, u64>, names: &HashMap<i32, String>, limit: Option<usize>) -> Vec<Holding> {
    let mut ranked: Vec<Holding> = counts
        .into_iter()
        .filter(|(_, open)| *open > 0)
        .filter_map(|(id, open)| {
            names.get(&id).map(|name| Holding {
                id,
                name: name.clone(),
                open,
            })
        })
        .collect();
    ranked.sort_by(|a, b| b.open.cmp(&a.open).then_with(|| a.name.cmp(&b.name)));
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }
    ranked
}

/// Open holdings (deliveries and loans not yet returned) as (department, employee) pairs
async fn open_holdings(
    db: &DatabaseConnection,
    kinds: &[AssignmentKind],
) -> Result<Vec<(i32, Option<i32>)>, DomainError> {
    Ok(Assignment::find()
        .select_only()
        .column(assignment::Column::DepartmentId)
        .column(assignment::Column::EmployeeId)
        .filter(assignment::Column::Active.eq(true))
        .filter(assignment::Column::ReturnedAt.is_null())
        .filter(assignment::Column::Kind.is_in(kinds.to_vec()))
        .into_tuple()
        .all(db)
        .await?)
}

async fn category_totals(db: &DatabaseConnection, only_active: bool) -> Result<Vec<CategoryTotals>, DomainError> {
    let mut categories = category::Entity::find();
    if only_active {
        categories = categories.filter(category::Column::Active.eq(true));
    }
    let categories = categories
        .order_by_asc(category::Column::Name)
        .all(db)
        .await?;

    let mut products = Product::find()
        .select_only()
        .column(product::Column::CategoryId)
        .column(product::Column::State);
    if only_active {
        products = products.filter(product::Column::Active.eq(true));
    }
    let rows: Vec<(i32, String)> = products.into_tuple().all(db).await?;

    let mut totals: HashMap<i32, (u64, u64, u64)> = HashMap::new();
    for (category_id, state) in rows {
        let entry = totals.entry(category_id).or_default();
        entry.0 += 1;
        if state == AssetState::Available.wire() {
            entry.1 += 1;
        } else if state == AssetState::Delivered.wire() {
            entry.2 += 1;
        }
    }

    Ok(categories
        .into_iter()
        .map(|c| {
            let (total, available, delivered) = totals.get(&c.id).copied().unwrap_or_default();
            CategoryTotals {
                id: c.id,
                name: c.name,
                total,
                available,
                delivered,
            }
        })
        .collect())
}

async fn warranties_ending(
    db: &DatabaseConnection,
    today: NaiveDate,
    only_active: bool,
    limit: Option<u64>,
) -> Result<Vec<WarrantyRow>, DomainError> {
    let horizon = today + Duration::days(WINDOW_DAYS);
    let mut query = Product::find()
        .filter(product::Column::WarrantyEndsOn.is_not_null())
        .filter(product::Column::WarrantyEndsOn.gte(today.format("%Y-%m-%d").to_string()))
        .filter(product::Column::WarrantyEndsOn.lte(horizon.format("%Y-%m-%d").to_string()))
        .order_by_asc(product::Column::WarrantyEndsOn);
    if only_active {
        query = query.filter(product::Column::Active.eq(true));
    }
    if let Some(limit) = limit {
        query = query.limit(limit);
    }

    Ok(query
        .all(db)
        .await?
        .into_iter()
        .map(|p| WarrantyRow {
            id: p.id,
            internal_id: p.internal_id,
            serial_number: p.serial_number,
            model: p.model,
            warranty_ends_on: p.warranty_ends_on.unwrap_or_default(),
        })
        .collect())
}

async fn raw_state_counts(db: &DatabaseConnection, only_active: bool) -> Result<BTreeMap<String, u64>, DomainError> {
    let mut query = Product::find()
        .select_only()
        .column(product::Column::State)
        .column_as(product::Column::Id.count(), "count")
        .group_by(product::Column::State);
    if only_active {
        query = query.filter(product::Column::Active.eq(true));
    }
    let rows: Vec<(String, i64)> = query.into_tuple().all(db).await?;
    Ok(rows
        .into_iter()
        .map(|(state, count)| (state, count.max(0) as u64))
        .collect())
}

pub async fn dashboard(db: &DatabaseConnection, today: NaiveDate) -> Result<Dashboard, DomainError> {
    let by_state = raw_state_counts(db, true).await?;
    let count_of = |state: AssetState| by_state.get(state.wire()).copied().unwrap_or(0);

    let departments = department::Entity::find()
        .filter(department::Column::Active.eq(true))
        .all(db)
        .await?;
    let employees = employee::Entity::find()
        .filter(employee::Column::Active.eq(true))
        .all(db)
        .await?;

    let mut per_department: HashMap<i32, u64> = HashMap::new();
    let mut per_employee: HashMap<i32, u64> = HashMap::new();
    for (department_id, employee_id) in
        open_holdings(db, &[AssignmentKind::Delivery, AssignmentKind::Loan]).await?
    {
        *per_department.entry(department_id).or_default() += 1;
        if let Some(employee_id) = employee_id {
            *per_employee.entry(employee_id).or_default() += 1;
        }
    }

    let department_names = names(departments.iter().map(|d| (d.id, d.name.clone())));
    let employee_names = names(employees.iter().map(|e| (e.id, e.name.clone())));

    let since = start_of_day(today - Duration::days(WINDOW_DAYS));
    let recent_assignments = Assignment::find()
        .filter(assignment::Column::Active.eq(true))
        .filter(assignment::Column::DeliveredAt.gte(since))
        .count(db)
        .await?;

    let unconfirmed = Assignment::find()
        .filter(assignment::Column::Active.eq(true))
        .filter(assignment::Column::ConfirmedByEmployee.eq(false))
        .filter(assignment::Column::ReturnedAt.is_null())
        .order_by_desc(assignment::Column::DeliveredAt)
        .limit(TOP_N as u64)
        .all(db)
        .await?;

    Ok(Dashboard {
        total_products: by_state.values().sum(),
        available: count_of(AssetState::Available),
        delivered: count_of(AssetState::Delivered),
        faulty: count_of(AssetState::Faulty),
        departments: departments.len() as u64,
        employees: employees.len() as u64,
        top_departments: rank(per_department, &department_names, Some(TOP_N)),
        top_employees: rank(per_employee, &employee_names, Some(TOP_N)),
        categories: category_totals(db, true).await?,
        recent_assignments,
        warranties_ending: warranties_ending(db, today, true, Some(TOP_N as u64)).await?,
        unconfirmed: enrich(db, unconfirmed).await?,
        by_state,
    })
}

/// Whole-inventory figures, retired products included
pub async fn inventory_report(db: &DatabaseConnection, today: NaiveDate) -> Result<InventoryReport, DomainError> {
    let by_state = raw_state_counts(db, false).await?;

    let mut by_category = category_totals(db, false)
        .await?
        .into_iter()
        .filter(|c| c.total > 0)
        .collect::<Vec<_>>();
    by_category.sort_by(|a, b| b.total.cmp(&a.total));

    let department_names = names(
        department::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|d| (d.id, d.name)),
    );
    let mut per_department: HashMap<i32, u64> = HashMap::new();
    for (department_id, _) in open_holdings(db, &[AssignmentKind::Delivery]).await? {
        *per_department.entry(department_id).or_default() += 1;
    }

    let prices: Vec<f64> = Product::find()
        .select_only()
        .column(product::Column::PurchasePrice)
        .into_tuple()
        .all(db)
        .await?;
    let total_value: f64 = prices.iter().sum();
    let average_price = if prices.is_empty() {
        0.0
    } else {
        total_value / prices.len() as f64
    };

    let since = start_of_day(today - Duration::days(WINDOW_DAYS));
    let recent_deliveries = Assignment::find()
        .filter(assignment::Column::Kind.eq(AssignmentKind::Delivery))
        .filter(assignment::Column::DeliveredAt.gte(since))
        .count(db)
        .await?;

    Ok(InventoryReport {
        generated_at: now_rfc3339(),
        total_products: by_state.values().sum(),
        by_state,
        by_category,
        by_department: rank(per_department, &department_names, None),
        total_value,
        average_price,
        warranties_ending: warranties_ending(db, today, false, None).await?,
        recent_deliveries,
    })
}

fn csv_bytes<T: Serialize>(rows: &[T]) -> Result<Vec<u8>, DomainError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| DomainError::Internal(format!("CSV export failed: {}", e)))?;
    }
    writer
        .into_inner()
        .map_err(|e| DomainError::Internal(format!("CSV export failed: {}", e)))
}

async fn product_rows(db: &DatabaseConnection) -> Result<Vec<ProductExportRow>, DomainError> {
    let categories = names(category::Entity::find().all(db).await?.into_iter().map(|c| (c.id, c.name)));
    let brands = names(brand::Entity::find().all(db).await?.into_iter().map(|b| (b.id, b.name)));
    let suppliers = names(supplier::Entity::find().all(db).await?.into_iter().map(|s| (s.id, s.name)));
    let locations = names(
        location::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|l| (l.id, l.full_name())),
    );

    Ok(Product::find()
        .order_by_asc(product::Column::InternalId)
        .all(db)
        .await?
        .into_iter()
        .map(|p| ProductExportRow {
            category: categories.get(&p.category_id).cloned().unwrap_or_default(),
            brand: brands.get(&p.brand_id).cloned().unwrap_or_default(),
            supplier: p.supplier_id.and_then(|id| suppliers.get(&id).cloned()),
            location: p.location_id.and_then(|id| locations.get(&id).cloned()),
            internal_id: p.internal_id,
            serial_number: p.serial_number,
            model: p.model,
            state: p.state.to_value(),
            condition: p.condition.to_value(),
            purchase_price: p.purchase_price,
            purchased_on: p.purchased_on,
            warranty_ends_on: p.warranty_ends_on,
        })
        .collect())
}

async fn assignment_rows(db: &DatabaseConnection) -> Result<Vec<AssignmentExportRow>, DomainError> {
    let products: HashMap<i32, product::Model> = Product::find()
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let brands = names(brand::Entity::find().all(db).await?.into_iter().map(|b| (b.id, b.name)));
    let employees = names(employee::Entity::find().all(db).await?.into_iter().map(|e| (e.id, e.name)));
    let departments = names(
        department::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|d| (d.id, d.name)),
    );

    Ok(Assignment::find()
        .order_by_desc(assignment::Column::DeliveredAt)
        .all(db)
        .await?
        .into_iter()
        .map(|a| {
            let product = products.get(&a.product_id);
            AssignmentExportRow {
                product: product
                    .map(|p| {
                        format!(
                            "{} {}",
                            brands.get(&p.brand_id).map(String::as_str).unwrap_or(""),
                            p.model
                        )
                        .trim()
                        .to_string()
                    })
                    .unwrap_or_default(),
                serial_number: product.map(|p| p.serial_number.clone()).unwrap_or_default(),
                employee: a.employee_id.and_then(|id| employees.get(&id).cloned()),
                department: departments.get(&a.department_id).cloned().unwrap_or_default(),
                kind: a.kind.to_value(),
                status: if a.is_pending() { "Open" } else { "Returned" },
                delivered_at: a.delivered_at,
                returned_at: a.returned_at,
                notes: a.delivery_notes,
            }
        })
        .collect())
}

/// Render products or assignments as a downloadable file
pub async fn export(
    db: &DatabaseConnection,
    kind: ExportKind,
    format: ExportFormat,
) -> Result<Export, DomainError> {
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let (stem, body) = match (kind, format) {
        (ExportKind::Products, ExportFormat::Csv) => ("products", csv_bytes(&product_rows(db).await?)?),
        (ExportKind::Products, ExportFormat::Json) => {
            ("products", serde_json::to_vec_pretty(&product_rows(db).await?)?)
        }
        (ExportKind::Assignments, ExportFormat::Csv) => {
            ("assignments", csv_bytes(&assignment_rows(db).await?)?)
        }
        (ExportKind::Assignments, ExportFormat::Json) => {
            ("assignments", serde_json::to_vec_pretty(&assignment_rows(db).await?)?)
        }
    };

    let (ext, content_type) = match format {
        ExportFormat::Csv => ("csv", "text/csv; charset=utf-8"),
        ExportFormat::Json => ("json", "application/json; charset=utf-8"),
    };

    tracing::debug!(stem, bytes = body.len(), "export rendered");
    Ok(Export {
        filename: format!("{}_{}.{}", stem, stamp, ext),
        content_type,
        body,
    })
}

async fn dump<E>(db: &DatabaseConnection) -> Result<Value, DomainError>
where
    E: EntityTrait,
    E::Model: Serialize,
{
    Ok(serde_json::to_value(E::find().all(db).await?)?)
}

/// Every business table as JSON, plus metadata about the snapshot
pub async fn backup(db: &DatabaseConnection, actor: &Actor) -> Result<Value, DomainError> {
    actor.require_admin("download backups")?;

    let total_products = Product::find().count(db).await?;
    let total_assignments = Assignment::find().count(db).await?;

    let snapshot = json!({
        "metadata": {
            "backup_id": uuid::Uuid::new_v4().to_string(),
            "created_at": now_rfc3339(),
            "total_products": total_products,
            "total_assignments": total_assignments,
            "version": env!("CARGO_PKG_VERSION"),
            "user": actor.username,
        },
        "categories": dump::<category::Entity>(db).await?,
        "departments": dump::<department::Entity>(db).await?,
        "brands": dump::<brand::Entity>(db).await?,
        "suppliers": dump::<supplier::Entity>(db).await?,
        "employees": dump::<employee::Entity>(db).await?,
        "locations": dump::<location::Entity>(db).await?,
        "products": dump::<product::Entity>(db).await?,
        "assignments": dump::<assignment::Entity>(db).await?,
        "product_types": dump::<product_type::Entity>(db).await?,
        "product_type_categories": dump::<product_type_category::Entity>(db).await?,
        "custom_data": dump::<custom_data::Entity>(db).await?,
    });

    tracing::info!(user = %actor.username, action = "BACKUP_CREATED", total_products, total_assignments);
    Ok(snapshot)
}
