use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_types")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    #[sea_orm(unique)]
    pub code_prefix: String,
    pub description: Option<String>,
    /// JSON object of `FieldDefinition`s keyed by field name
    pub custom_fields: String,
    /// Last number handed out by the sequential counter
    pub last_number: i32,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_type_category::Entity")]
    ProductTypeCategory,
    #[sea_orm(has_many = "super::custom_data::Entity")]
    CustomData,
}

impl Related<super::product_type_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductTypeCategory.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        super::product_type_category::Relation::Category.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::product_type_category::Relation::ProductType.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
