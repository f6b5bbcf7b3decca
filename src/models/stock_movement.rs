use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
pub enum MovementKind {
    #[sea_orm(string_value = "ALTA")]
    #[serde(rename = "ALTA")]
    Intake,
    #[sea_orm(string_value = "BAJA")]
    #[serde(rename = "BAJA")]
    Retirement,
    #[sea_orm(string_value = "TRANSFERENCIA")]
    #[serde(rename = "TRANSFERENCIA")]
    Transfer,
    #[sea_orm(string_value = "ACTUALIZACION")]
    #[serde(rename = "ACTUALIZACION")]
    Update,
    #[sea_orm(string_value = "REPARACION")]
    #[serde(rename = "REPARACION")]
    Repair,
    #[sea_orm(string_value = "RETORNO_REPARACION")]
    #[serde(rename = "RETORNO_REPARACION")]
    RepairReturn,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_id: i32,
    pub kind: MovementKind,
    pub user_id: i32,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub description: String,
    /// JSON snapshot of the changed fields before the movement
    pub previous_values: String,
    pub new_values: String,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
