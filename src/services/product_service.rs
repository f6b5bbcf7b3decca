//! Product Service - registration, edits and retirement of assets

use sea_orm::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::path::Path;

use super::Actor;
use super::movement_service::{self, NewMovement};
use crate::domain::attributes::{
    self, Attributes, FieldDefinitions, parse_attributes, parse_definitions, retain_defined,
    validate_against,
};
use crate::domain::identifiers::{generate_unique, internal_id_candidate, serial_candidate};
use crate::domain::{DomainError, LifecycleEvent};
use crate::models::assignment::{self, Entity as Assignment};
use crate::models::product::{self, AssetCondition, AssetState, Entity as Product};
use crate::models::{
    brand, category, custom_data, location, parse_vocab, product_type, sticker, stock_movement,
    supplier, MovementKind,
};
use crate::utils::dates::{now_rfc3339, parse_date};

pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductInput {
    pub category_id: i32,
    pub brand_id: i32,
    pub model: String,
    /// Generated when absent
    pub serial_number: Option<String>,
    pub barcode: Option<String>,
    pub condition: Option<AssetCondition>,
    pub supplier_id: Option<i32>,
    pub purchased_on: String,
    pub purchase_price: f64,
    pub invoice_number: Option<String>,
    pub warranty_ends_on: Option<String>,
    pub location_id: Option<i32>,
    #[serde(default)]
    pub specifications: Attributes,
    pub notes: Option<String>,
}

/// Partial update; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductInput {
    pub category_id: Option<i32>,
    pub brand_id: Option<i32>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub barcode: Option<String>,
    /// Manual state change, admin only
    pub state: Option<AssetState>,
    pub condition: Option<AssetCondition>,
    pub supplier_id: Option<i32>,
    pub purchased_on: Option<String>,
    pub purchase_price: Option<f64>,
    pub invoice_number: Option<String>,
    pub warranty_ends_on: Option<String>,
    pub location_id: Option<i32>,
    pub specifications: Option<Attributes>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category_id: Option<i32>,
    pub brand_id: Option<i32>,
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductSummary {
    #[serde(flatten)]
    pub product: product::Model,
    pub category_name: Option<String>,
    pub brand_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<ProductSummary>,
    pub total: usize,
    /// Active products per state, over the whole inventory
    pub counts: BTreeMap<String, u64>,
}

#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: product::Model,
    pub specifications_parsed: Attributes,
    pub category_name: Option<String>,
    pub brand_name: Option<String>,
    pub supplier_name: Option<String>,
    pub location_name: Option<String>,
    pub open_assignment: Option<assignment::Model>,
    pub stickers: Vec<sticker::Model>,
    pub product_type: Option<String>,
    pub custom_data: Option<Attributes>,
    pub recent_movements: Vec<stock_movement::Model>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_price(price: f64) -> Result<(), DomainError> {
    if !price.is_finite() || price < 0.0 {
        return Err(DomainError::Validation(
            "Purchase price must be zero or greater".to_string(),
        ));
    }
    Ok(())
}

async fn active_category(db: &DatabaseConnection, id: i32) -> Result<category::Model, DomainError> {
    category::Entity::find_by_id(id)
        .filter(category::Column::Active.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| DomainError::Validation("Category not found or inactive".to_string()))
}

async fn active_brand(db: &DatabaseConnection, id: i32) -> Result<brand::Model, DomainError> {
    brand::Entity::find_by_id(id)
        .filter(brand::Column::Active.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| DomainError::Validation("Brand not found or inactive".to_string()))
}

async fn check_references(
    db: &DatabaseConnection,
    supplier_id: Option<i32>,
    location_id: Option<i32>,
) -> Result<(), DomainError> {
    if let Some(id) = supplier_id {
        if supplier::Entity::find_by_id(id).one(db).await?.is_none() {
            return Err(DomainError::Validation("Supplier not found".to_string()));
        }
    }
    if let Some(id) = location_id {
        if location::Entity::find_by_id(id).one(db).await?.is_none() {
            return Err(DomainError::Validation("Location not found".to_string()));
        }
    }
    Ok(())
}

/// Unique across active and inactive products, optionally ignoring one row
async fn value_taken(
    db: &DatabaseConnection,
    column: product::Column,
    value: &str,
    exclude: Option<i32>,
) -> Result<bool, DomainError> {
    let mut query = Product::find().filter(column.eq(value));
    if let Some(id) = exclude {
        query = query.filter(product::Column::Id.ne(id));
    }
    Ok(query.count(db).await? > 0)
}

async fn check_identifiers(
    db: &DatabaseConnection,
    serial: Option<&str>,
    barcode: Option<&str>,
    exclude: Option<i32>,
) -> Result<(), DomainError> {
    if let Some(serial) = serial {
        if value_taken(db, product::Column::SerialNumber, serial, exclude).await? {
            return Err(DomainError::Validation(format!(
                "A product with serial number {} already exists",
                serial
            )));
        }
    }
    if let Some(barcode) = barcode {
        if value_taken(db, product::Column::Barcode, barcode, exclude).await? {
            return Err(DomainError::Validation(format!(
                "A product with barcode {} already exists",
                barcode
            )));
        }
    }
    Ok(())
}

/// Keep only the category's fields (when it defines any) and validate them
fn category_specifications(
    category: &category::Model,
    specifications: Attributes,
) -> Result<Attributes, DomainError> {
    let definitions = parse_definitions(&category.specific_fields);
    if definitions.is_empty() {
        return Ok(specifications);
    }

    let kept = retain_defined(specifications, &definitions);
    let problems = validate_against(&definitions, &kept);
    if !problems.is_empty() {
        return Err(DomainError::Validation(problems.join("; ")));
    }
    Ok(kept)
}

/// Register a new asset. It starts `DISPONIBLE` with generated identifiers.
pub async fn create_product(
    db: &DatabaseConnection,
    input: CreateProductInput,
    actor: &Actor,
) -> Result<product::Model, DomainError> {
    let model = input.model.trim().to_string();
    if model.is_empty() {
        return Err(DomainError::Validation("Model is required".to_string()));
    }
    check_price(input.purchase_price)?;
    let purchased_on = parse_date(&input.purchased_on, "Purchase date")?;
    let warranty_ends_on = trimmed(input.warranty_ends_on)
        .map(|d| parse_date(&d, "Warranty end date"))
        .transpose()?;

    let category = active_category(db, input.category_id).await?;
    active_brand(db, input.brand_id).await?;
    check_references(db, input.supplier_id, input.location_id).await?;

    let serial_number = trimmed(input.serial_number);
    let barcode = trimmed(input.barcode);
    check_identifiers(db, serial_number.as_deref(), barcode.as_deref(), None).await?;

    let specifications = category_specifications(&category, input.specifications)?;

    let code = Some(category.code.as_str());
    let internal_id = generate_unique(
        || internal_id_candidate(code, &mut rand::thread_rng()),
        move |candidate| async move {
            value_taken(db, product::Column::InternalId, &candidate, None).await
        },
    )
    .await?;

    let serial_number = match serial_number {
        Some(serial) => serial,
        None => {
            let year = chrono::Datelike::year(&chrono::Utc::now());
            generate_unique(
                || serial_candidate(code, year, &mut rand::thread_rng()),
                move |candidate| async move {
                    value_taken(db, product::Column::SerialNumber, &candidate, None).await
                },
            )
            .await?
        }
    };

    let now = now_rfc3339();
    let new_product = product::ActiveModel {
        internal_id: Set(internal_id),
        category_id: Set(category.id),
        brand_id: Set(input.brand_id),
        model: Set(model),
        image_path: Set(None),
        serial_number: Set(serial_number),
        barcode: Set(barcode),
        state: Set(AssetState::Available),
        condition: Set(input.condition.unwrap_or(AssetCondition::New)),
        supplier_id: Set(input.supplier_id),
        purchased_on: Set(purchased_on.format("%Y-%m-%d").to_string()),
        purchase_price: Set(input.purchase_price),
        invoice_number: Set(trimmed(input.invoice_number)),
        warranty_ends_on: Set(warranty_ends_on.map(|d| d.format("%Y-%m-%d").to_string())),
        location_id: Set(input.location_id),
        specifications: Set(attributes::to_json_text(&specifications)),
        notes: Set(trimmed(input.notes)),
        active: Set(true),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let txn = db.begin().await?;
    let saved = new_product.insert(&txn).await?;
    movement_service::record(
        &txn,
        NewMovement::new(
            saved.id,
            MovementKind::Intake,
            actor.user_id,
            format!("Registered {} ({})", saved.internal_id, saved.serial_number),
        )
        .values(json!({}), json!({ "state": saved.state, "condition": saved.condition })),
    )
    .await?;
    txn.commit().await?;

    tracing::info!(user = %actor.username, action = "PRODUCT_CREATED", serial = %saved.serial_number);
    Ok(saved)
}

/// Active products matching the filter, newest first
pub async fn list_products(
    db: &DatabaseConnection,
    filter: ProductFilter,
) -> Result<ProductList, DomainError> {
    let mut condition = Condition::all().add(product::Column::Active.eq(true));

    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        condition = condition.add(
            Condition::any()
                .add(product::Column::InternalId.contains(search))
                .add(product::Column::SerialNumber.contains(search))
                .add(product::Column::Model.contains(search))
                .add(product::Column::Notes.contains(search)),
        );
    }
    if let Some(category_id) = filter.category_id {
        condition = condition.add(product::Column::CategoryId.eq(category_id));
    }
    if let Some(brand_id) = filter.brand_id {
        condition = condition.add(product::Column::BrandId.eq(brand_id));
    }
    if let Some(state) = filter.state.as_deref().filter(|s| !s.is_empty()) {
        match parse_vocab::<AssetState>(state) {
            Some(state) => condition = condition.add(product::Column::State.eq(state)),
            None => tracing::warn!(state, "ignoring unknown state filter"),
        }
    }

    let rows = Product::find()
        .find_also_related(category::Entity)
        .filter(condition)
        .order_by_desc(product::Column::CreatedAt)
        .order_by_desc(product::Column::Id)
        .all(db)
        .await?;

    let brand_ids: Vec<i32> = rows.iter().map(|(p, _)| p.brand_id).collect();
    let brands: BTreeMap<i32, String> = brand::Entity::find()
        .filter(brand::Column::Id.is_in(brand_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|b| (b.id, b.name))
        .collect();

    let products: Vec<ProductSummary> = rows
        .into_iter()
        .map(|(product, category)| ProductSummary {
            brand_name: brands.get(&product.brand_id).cloned(),
            category_name: category.map(|c| c.name),
            product,
        })
        .collect();

    let counts = state_counts(db).await?;

    Ok(ProductList {
        total: products.len(),
        products,
        counts,
    })
}

/// Active products per state, keyed by wire value
pub async fn state_counts(db: &DatabaseConnection) -> Result<BTreeMap<String, u64>, DomainError> {
    let rows: Vec<(String, i64)> = Product::find()
        .select_only()
        .column(product::Column::State)
        .column_as(product::Column::Id.count(), "count")
        .filter(product::Column::Active.eq(true))
        .group_by(product::Column::State)
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(state, count)| (state, count.max(0) as u64))
        .collect())
}

pub async fn find_product(db: &DatabaseConnection, id: i32) -> Result<product::Model, DomainError> {
    Product::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Product"))
}

/// Open (not yet returned) assignment of a product, if any
pub async fn open_assignment<C: ConnectionTrait>(
    conn: &C,
    product_id: i32,
) -> Result<Option<assignment::Model>, DomainError> {
    Ok(Assignment::find()
        .filter(assignment::Column::ProductId.eq(product_id))
        .filter(assignment::Column::ReturnedAt.is_null())
        .filter(assignment::Column::Active.eq(true))
        .order_by_desc(assignment::Column::DeliveredAt)
        .one(conn)
        .await?)
}

pub async fn get_product(db: &DatabaseConnection, id: i32) -> Result<ProductDetail, DomainError> {
    let product = find_product(db, id).await?;

    let category_name = category::Entity::find_by_id(product.category_id)
        .one(db)
        .await?
        .map(|c| c.name);
    let brand_name = brand::Entity::find_by_id(product.brand_id)
        .one(db)
        .await?
        .map(|b| b.name);
    let supplier_name = match product.supplier_id {
        Some(sid) => supplier::Entity::find_by_id(sid).one(db).await?.map(|s| s.name),
        None => None,
    };
    let location_name = match product.location_id {
        Some(lid) => location::Entity::find_by_id(lid)
            .one(db)
            .await?
            .map(|l| l.full_name()),
        None => None,
    };

    let open_assignment = open_assignment(db, id).await?;

    let stickers = sticker::Entity::find()
        .filter(sticker::Column::ProductId.eq(id))
        .filter(sticker::Column::Active.eq(true))
        .order_by_desc(sticker::Column::GeneratedAt)
        .all(db)
        .await?;

    let custom = custom_data::Entity::find()
        .filter(custom_data::Column::ProductId.eq(id))
        .find_also_related(product_type::Entity)
        .one(db)
        .await?;
    let (product_type, custom_data) = match custom {
        Some((data, ptype)) => (ptype.map(|t| t.name), Some(parse_attributes(&data.data))),
        None => (None, None),
    };

    let recent_movements = movement_service::for_product(db, id, 10).await?;

    Ok(ProductDetail {
        specifications_parsed: parse_attributes(&product.specifications),
        product,
        category_name,
        brand_name,
        supplier_name,
        location_name,
        open_assignment,
        stickers,
        product_type,
        custom_data,
        recent_movements,
    })
}

fn diff(before: &product::Model, after: &product::Model) -> (Map<String, Value>, Map<String, Value>) {
    let (Ok(Value::Object(old)), Ok(Value::Object(new))) =
        (serde_json::to_value(before), serde_json::to_value(after))
    else {
        return (Map::new(), Map::new());
    };

    let mut previous = Map::new();
    let mut current = Map::new();
    for (key, new_value) in new {
        if key == "updated_at" {
            continue;
        }
        let old_value = old.get(&key).cloned().unwrap_or(Value::Null);
        if old_value != new_value {
            previous.insert(key.clone(), old_value);
            current.insert(key, new_value);
        }
    }
    (previous, current)
}

async fn location_label(db: &DatabaseConnection, id: Option<i32>) -> Result<Option<String>, DomainError> {
    Ok(match id {
        Some(id) => location::Entity::find_by_id(id)
            .one(db)
            .await?
            .map(|l| l.full_name()),
        None => None,
    })
}

/// Edit an active product. Records what changed as an `ACTUALIZACION` movement,
/// plus a `TRANSFERENCIA` when the location moves.
pub async fn update_product(
    db: &DatabaseConnection,
    id: i32,
    input: UpdateProductInput,
    actor: &Actor,
) -> Result<product::Model, DomainError> {
    let existing = find_product(db, id).await?;
    if !existing.active {
        return Err(DomainError::not_found("Product"));
    }

    let mut updated = existing.clone();

    if let Some(category_id) = input.category_id {
        if category_id != existing.category_id {
            active_category(db, category_id).await?;
        }
        updated.category_id = category_id;
    }
    if let Some(brand_id) = input.brand_id {
        if brand_id != existing.brand_id {
            active_brand(db, brand_id).await?;
        }
        updated.brand_id = brand_id;
    }
    if let Some(model) = input.model {
        let model = model.trim().to_string();
        if model.is_empty() {
            return Err(DomainError::Validation("Model is required".to_string()));
        }
        updated.model = model;
    }
    if let Some(serial) = input.serial_number {
        let serial = serial.trim().to_string();
        if serial.is_empty() {
            return Err(DomainError::Validation("Serial number cannot be empty".to_string()));
        }
        updated.serial_number = serial;
    }
    if let Some(barcode) = input.barcode {
        updated.barcode = trimmed(Some(barcode));
    }
    if let Some(state) = input.state {
        if state != existing.state {
            actor.require_admin("change a product's state manually")?;
            updated.state = existing
                .state
                .apply(&LifecycleEvent::Override(state))
                .map_err(|e| DomainError::BusinessRule(e.to_string()))?;
        }
    }
    if let Some(condition) = input.condition {
        updated.condition = condition;
    }
    if let Some(supplier_id) = input.supplier_id {
        updated.supplier_id = Some(supplier_id);
    }
    if let Some(date) = input.purchased_on {
        updated.purchased_on = parse_date(&date, "Purchase date")?.format("%Y-%m-%d").to_string();
    }
    if let Some(price) = input.purchase_price {
        check_price(price)?;
        updated.purchase_price = price;
    }
    if let Some(invoice) = input.invoice_number {
        updated.invoice_number = trimmed(Some(invoice));
    }
    if let Some(date) = input.warranty_ends_on {
        updated.warranty_ends_on = trimmed(Some(date))
            .map(|d| parse_date(&d, "Warranty end date").map(|d| d.format("%Y-%m-%d").to_string()))
            .transpose()?;
    }
    if let Some(location_id) = input.location_id {
        updated.location_id = Some(location_id);
    }
    if let Some(notes) = input.notes {
        updated.notes = trimmed(Some(notes));
    }
    if let Some(specifications) = input.specifications {
        let category = active_category(db, updated.category_id).await?;
        updated.specifications =
            attributes::to_json_text(&category_specifications(&category, specifications)?);
    }

    check_references(db, updated.supplier_id, updated.location_id).await?;
    check_identifiers(
        db,
        Some(updated.serial_number.as_str()).filter(|s| *s != existing.serial_number),
        updated.barcode.as_deref().filter(|b| existing.barcode.as_deref() != Some(*b)),
        Some(id),
    )
    .await?;

    let (previous, current) = diff(&existing, &updated);
    if current.is_empty() {
        return Ok(existing);
    }

    let moved = existing.location_id != updated.location_id;
    let (from_location, to_location) = if moved {
        (
            location_label(db, existing.location_id).await?,
            location_label(db, updated.location_id).await?,
        )
    } else {
        (None, None)
    };

    let mut active: product::ActiveModel = existing.clone().into();
    active.category_id = Set(updated.category_id);
    active.brand_id = Set(updated.brand_id);
    active.model = Set(updated.model.clone());
    active.serial_number = Set(updated.serial_number.clone());
    active.barcode = Set(updated.barcode.clone());
    active.state = Set(updated.state);
    active.condition = Set(updated.condition);
    active.supplier_id = Set(updated.supplier_id);
    active.purchased_on = Set(updated.purchased_on.clone());
    active.purchase_price = Set(updated.purchase_price);
    active.invoice_number = Set(updated.invoice_number.clone());
    active.warranty_ends_on = Set(updated.warranty_ends_on.clone());
    active.location_id = Set(updated.location_id);
    active.specifications = Set(updated.specifications.clone());
    active.notes = Set(updated.notes.clone());
    active.updated_at = Set(now_rfc3339());

    let changed: Vec<String> = current.keys().cloned().collect();

    let txn = db.begin().await?;
    let saved = active.update(&txn).await?;
    movement_service::record(
        &txn,
        NewMovement::new(
            saved.id,
            MovementKind::Update,
            actor.user_id,
            format!("Updated {}", changed.join(", ")),
        )
        .values(Value::Object(previous), Value::Object(current)),
    )
    .await?;
    if moved {
        movement_service::record(
            &txn,
            NewMovement::new(
                saved.id,
                MovementKind::Transfer,
                actor.user_id,
                "Location changed",
            )
            .route(from_location, to_location)
            .values(
                json!({ "location_id": existing.location_id }),
                json!({ "location_id": saved.location_id }),
            ),
        )
        .await?;
    }
    txn.commit().await?;

    tracing::info!(user = %actor.username, action = "PRODUCT_UPDATED", serial = %saved.serial_number, fields = ?changed);
    Ok(saved)
}

/// Soft-delete. Refused while the product is out on an assignment.
pub async fn retire_product(
    db: &DatabaseConnection,
    id: i32,
    actor: &Actor,
) -> Result<product::Model, DomainError> {
    actor.require_admin("retire products")?;

    let existing = find_product(db, id).await?;
    if !existing.active {
        return Err(DomainError::not_found("Product"));
    }

    if open_assignment(db, id).await?.is_some() {
        return Err(DomainError::BusinessRule(
            "A product with an open assignment cannot be retired".to_string(),
        ));
    }

    let txn = db.begin().await?;
    let mut active: product::ActiveModel = existing.into();
    active.active = Set(false);
    active.updated_at = Set(now_rfc3339());
    let saved = active.update(&txn).await?;

    movement_service::record(
        &txn,
        NewMovement::new(
            saved.id,
            MovementKind::Retirement,
            actor.user_id,
            format!("Retired {}", saved.serial_number),
        )
        .values(json!({ "active": true }), json!({ "active": false })),
    )
    .await?;
    txn.commit().await?;

    tracing::info!(user = %actor.username, action = "PRODUCT_DELETED", serial = %saved.serial_number);
    Ok(saved)
}

/// Store an uploaded image under `<media_root>/productos/` and point the product at it
pub async fn attach_image(
    db: &DatabaseConnection,
    media_root: &Path,
    max_bytes: u64,
    id: i32,
    filename: &str,
    bytes: &[u8],
) -> Result<product::Model, DomainError> {
    let product = find_product(db, id).await?;

    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .filter(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
        .ok_or_else(|| {
            DomainError::Validation(format!(
                "Image must be one of: {}",
                IMAGE_EXTENSIONS.join(", ")
            ))
        })?;

    if bytes.is_empty() {
        return Err(DomainError::Validation("The uploaded file is empty".to_string()));
    }
    if bytes.len() as u64 > max_bytes {
        return Err(DomainError::Validation(format!(
            "Image exceeds the maximum size of {} MB",
            max_bytes / (1024 * 1024)
        )));
    }

    let relative = format!(
        "productos/{}_{}.{}",
        product.internal_id,
        chrono::Utc::now().format("%Y%m%d_%H%M%S%3f"),
        ext
    );
    let target = media_root.join(&relative);
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, bytes).await?;

    if let Some(old) = &product.image_path {
        if let Err(e) = tokio::fs::remove_file(media_root.join(old)).await {
            tracing::warn!(path = %old, error = %e, "could not remove previous image");
        }
    }

    let mut active: product::ActiveModel = product.into();
    active.image_path = Set(Some(relative));
    active.updated_at = Set(now_rfc3339());
    Ok(active.update(db).await?)
}

/// Field definitions of an active category
pub async fn category_fields(
    db: &DatabaseConnection,
    category_id: i32,
) -> Result<FieldDefinitions, DomainError> {
    let category = category::Entity::find_by_id(category_id)
        .filter(category::Column::Active.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Category"))?;

    Ok(parse_definitions(&category.specific_fields))
}
