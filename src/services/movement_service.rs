//! Stock movement log - audit trail of inventory-level changes

use sea_orm::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::DomainError;
use crate::models::product::{self, Entity as Product};
use crate::models::stock_movement::{self, Entity as StockMovement, MovementKind};
use crate::models::parse_vocab;
use crate::utils::dates::{now_rfc3339, parse_date, start_of_day, today};

/// Listing cap
pub const LIST_LIMIT: u64 = 100;

/// A movement about to be written
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub product_id: i32,
    pub kind: MovementKind,
    pub user_id: i32,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub description: String,
    pub previous_values: Value,
    pub new_values: Value,
}

impl NewMovement {
    pub fn new(product_id: i32, kind: MovementKind, user_id: i32, description: impl Into<String>) -> Self {
        Self {
            product_id,
            kind,
            user_id,
            origin: None,
            destination: None,
            description: description.into(),
            previous_values: Value::Object(Default::default()),
            new_values: Value::Object(Default::default()),
        }
    }

    pub fn route(mut self, origin: Option<String>, destination: Option<String>) -> Self {
        self.origin = origin;
        self.destination = destination;
        self
    }

    pub fn values(mut self, previous: Value, new: Value) -> Self {
        self.previous_values = previous;
        self.new_values = new;
        self
    }
}

/// Append a movement. Works inside a transaction or on the plain connection.
pub async fn record<C: ConnectionTrait>(
    conn: &C,
    movement: NewMovement,
) -> Result<stock_movement::Model, DomainError> {
    let row = stock_movement::ActiveModel {
        product_id: Set(movement.product_id),
        kind: Set(movement.kind),
        user_id: Set(movement.user_id),
        origin: Set(movement.origin),
        destination: Set(movement.destination),
        description: Set(movement.description),
        previous_values: Set(movement.previous_values.to_string()),
        new_values: Set(movement.new_values.to_string()),
        created_at: Set(now_rfc3339()),
        ..Default::default()
    };

    let saved = row.insert(conn).await?;
    tracing::debug!(product_id = saved.product_id, kind = ?saved.kind, "stock movement recorded");
    Ok(saved)
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct MovementFilter {
    pub search: Option<String>,
    pub kind: Option<String>,
    /// `YYYY-MM-DD`, inclusive
    pub from: Option<String>,
    /// `YYYY-MM-DD`, inclusive
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MovementRow {
    #[serde(flatten)]
    pub movement: stock_movement::Model,
    pub serial_number: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MovementList {
    pub movements: Vec<MovementRow>,
    pub total: u64,
    pub today: u64,
}

pub async fn list_movements(
    db: &DatabaseConnection,
    filter: MovementFilter,
) -> Result<MovementList, DomainError> {
    let mut condition = Condition::all();

    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        condition = condition.add(
            Condition::any()
                .add(product::Column::SerialNumber.contains(search))
                .add(product::Column::Model.contains(search))
                .add(stock_movement::Column::Description.contains(search))
                .add(stock_movement::Column::Origin.contains(search))
                .add(stock_movement::Column::Destination.contains(search)),
        );
    }

    if let Some(kind) = filter.kind.as_deref().filter(|k| !k.is_empty()) {
        match parse_vocab::<MovementKind>(kind) {
            Some(kind) => condition = condition.add(stock_movement::Column::Kind.eq(kind)),
            None => tracing::warn!(kind, "ignoring unknown movement kind filter"),
        }
    }

    // Invalid bounds are ignored rather than rejected
    if let Some(from) = filter.from.as_deref().filter(|d| !d.is_empty()) {
        match parse_date(from, "From") {
            Ok(d) => condition = condition.add(stock_movement::Column::CreatedAt.gte(start_of_day(d))),
            Err(_) => tracing::warn!(from, "ignoring invalid start date"),
        }
    }
    if let Some(to) = filter.to.as_deref().filter(|d| !d.is_empty()) {
        match parse_date(to, "To").map(|d| d.succ_opt()) {
            Ok(Some(next)) => {
                condition = condition.add(stock_movement::Column::CreatedAt.lt(start_of_day(next)))
            }
            _ => tracing::warn!(to, "ignoring invalid end date"),
        }
    }

    let rows = StockMovement::find()
        .find_also_related(Product)
        .filter(condition)
        .order_by_desc(stock_movement::Column::CreatedAt)
        .order_by_desc(stock_movement::Column::Id)
        .limit(LIST_LIMIT)
        .all(db)
        .await?;

    let movements = rows
        .into_iter()
        .map(|(movement, product)| MovementRow {
            movement,
            serial_number: product.as_ref().map(|p| p.serial_number.clone()),
            model: product.map(|p| p.model),
        })
        .collect();

    let total = StockMovement::find().count(db).await?;
    let today = StockMovement::find()
        .filter(stock_movement::Column::CreatedAt.gte(start_of_day(today())))
        .count(db)
        .await?;

    Ok(MovementList {
        movements,
        total,
        today,
    })
}

/// Most recent movements of one product
pub async fn for_product(
    db: &DatabaseConnection,
    product_id: i32,
    limit: u64,
) -> Result<Vec<stock_movement::Model>, DomainError> {
    Ok(StockMovement::find()
        .filter(stock_movement::Column::ProductId.eq(product_id))
        .order_by_desc(stock_movement::Column::CreatedAt)
        .order_by_desc(stock_movement::Column::Id)
        .limit(limit)
        .all(db)
        .await?)
}
