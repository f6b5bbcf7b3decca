use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
pub enum AssignmentKind {
    #[sea_orm(string_value = "ENTREGA")]
    #[serde(rename = "ENTREGA")]
    Delivery,
    #[sea_orm(string_value = "DEVOLUCION")]
    #[serde(rename = "DEVOLUCION")]
    Return,
    #[sea_orm(string_value = "REPARACION")]
    #[serde(rename = "REPARACION")]
    Repair,
    #[sea_orm(string_value = "RETORNO_REPARACION")]
    #[serde(rename = "RETORNO_REPARACION")]
    RepairReturn,
    #[sea_orm(string_value = "BAJA")]
    #[serde(rename = "BAJA")]
    Retirement,
    #[sea_orm(string_value = "PRESTAMO")]
    #[serde(rename = "PRESTAMO")]
    Loan,
    #[sea_orm(string_value = "FIN_PRESTAMO")]
    #[serde(rename = "FIN_PRESTAMO")]
    LoanEnd,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
pub enum ReturnReason {
    #[sea_orm(string_value = "CAMBIO_EMPLEADO")]
    #[serde(rename = "CAMBIO_EMPLEADO")]
    EmployeeChange,
    #[sea_orm(string_value = "AVERIA")]
    #[serde(rename = "AVERIA")]
    Breakdown,
    #[sea_orm(string_value = "OBSOLETO")]
    #[serde(rename = "OBSOLETO")]
    Obsolete,
    #[sea_orm(string_value = "ACTUALIZACION")]
    #[serde(rename = "ACTUALIZACION")]
    Upgrade,
    #[sea_orm(string_value = "FIN_CONTRATO")]
    #[serde(rename = "FIN_CONTRATO")]
    ContractEnd,
    #[sea_orm(string_value = "TRASLADO")]
    #[serde(rename = "TRASLADO")]
    Relocation,
    #[sea_orm(string_value = "ROBO_PERDIDA")]
    #[serde(rename = "ROBO_PERDIDA")]
    TheftOrLoss,
    #[sea_orm(string_value = "OTROS")]
    #[serde(rename = "OTROS")]
    Other,
}

/// One hand-over of an asset. `returned_at` is null while the asset is still out.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "assignments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_id: i32,
    pub employee_id: Option<i32>,
    pub department_id: i32,
    pub kind: AssignmentKind,
    pub delivered_at: String,
    pub returned_at: Option<String>,
    pub expected_return_on: Option<String>,
    pub return_reason: Option<ReturnReason>,
    pub delivery_notes: Option<String>,
    pub return_notes: Option<String>,
    pub delivered_by: i32,
    pub returned_by: Option<i32>,
    pub delivery_document: Option<String>,
    pub return_document: Option<String>,
    pub condition_on_delivery: String,
    /// Free text entered by the returning user
    pub condition_on_return: Option<String>,
    pub confirmed_by_employee: bool,
    pub confirmed_at: Option<String>,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Model {
    pub fn is_pending(&self) -> bool {
        self.returned_at.is_none()
    }
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
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::EmployeeId",
        to = "super::employee::Column::Id"
    )]
    Employee,
    #[sea_orm(
        belongs_to = "super::department::Entity",
        from = "Column::DepartmentId",
        to = "super::department::Column::Id"
    )]
    Department,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
