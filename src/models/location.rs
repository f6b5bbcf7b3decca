use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "locations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub building: Option<String>,
    pub floor: Option<String>,
    pub room: Option<String>,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl Model {
    /// "Name - Building - Floor - Room", skipping empty parts
    pub fn full_name(&self) -> String {
        let mut parts = vec![self.name.as_str()];
        for part in [&self.building, &self.floor, &self.room].into_iter().flatten() {
            if !part.is_empty() {
                parts.push(part.as_str());
            }
        }
        parts.join(" - ")
    }
}

impl ActiveModelBehavior for ActiveModel {}
