use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Where an asset sits in its lifecycle.
/// Only `domain::lifecycle` decides transitions between these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
pub enum AssetState {
    #[sea_orm(string_value = "DISPONIBLE")]
    #[serde(rename = "DISPONIBLE")]
    Available,
    #[sea_orm(string_value = "ENTREGADO")]
    #[serde(rename = "ENTREGADO")]
    Delivered,
    #[sea_orm(string_value = "AVERIADO")]
    #[serde(rename = "AVERIADO")]
    Faulty,
    #[sea_orm(string_value = "ROTO")]
    #[serde(rename = "ROTO")]
    Broken,
    #[sea_orm(string_value = "RECOGIDO")]
    #[serde(rename = "RECOGIDO")]
    Collected,
    #[sea_orm(string_value = "BAJA")]
    #[serde(rename = "BAJA")]
    Retired,
    #[sea_orm(string_value = "MANTENIMIENTO")]
    #[serde(rename = "MANTENIMIENTO")]
    Maintenance,
}

/// Physical condition recorded at registration and snapshotted on delivery
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
pub enum AssetCondition {
    #[sea_orm(string_value = "NUEVO")]
    #[serde(rename = "NUEVO")]
    New,
    #[sea_orm(string_value = "USADO_BUENO")]
    #[serde(rename = "USADO_BUENO")]
    UsedGood,
    #[sea_orm(string_value = "USADO_REGULAR")]
    #[serde(rename = "USADO_REGULAR")]
    UsedFair,
    #[sea_orm(string_value = "AVERIADO")]
    #[serde(rename = "AVERIADO")]
    Faulty,
    #[sea_orm(string_value = "OBSOLETO")]
    #[serde(rename = "OBSOLETO")]
    Obsolete,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Human-facing id, e.g. `LAP4821`
    #[sea_orm(unique)]
    pub internal_id: String,
    pub category_id: i32,
    pub brand_id: i32,
    pub model: String,
    pub image_path: Option<String>,
    #[sea_orm(unique)]
    pub serial_number: String,
    #[sea_orm(unique)]
    pub barcode: Option<String>,
    pub state: AssetState,
    pub condition: AssetCondition,
    pub supplier_id: Option<i32>,
    pub purchased_on: String,
    pub purchase_price: f64,
    pub invoice_number: Option<String>,
    pub warranty_ends_on: Option<String>,
    pub location_id: Option<i32>,
    /// JSON object of category-specific attributes
    pub specifications: String,
    pub notes: Option<String>,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(
        belongs_to = "super::brand::Entity",
        from = "Column::BrandId",
        to = "super::brand::Column::Id"
    )]
    Brand,
    #[sea_orm(
        belongs_to = "super::supplier::Entity",
        from = "Column::SupplierId",
        to = "super::supplier::Column::Id"
    )]
    Supplier,
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::LocationId",
        to = "super::location::Column::Id"
    )]
    Location,
    #[sea_orm(has_many = "super::assignment::Entity")]
    Assignment,
    #[sea_orm(has_many = "super::stock_movement::Entity")]
    StockMovement,
    #[sea_orm(has_many = "super::sticker::Entity")]
    Sticker,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::brand::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Brand.def()
    }
}

impl Related<super::supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl Related<super::assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignment.def()
    }
}

impl Related<super::stock_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockMovement.def()
    }
}

impl Related<super::sticker::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sticker.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
