use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
pub enum StickerKind {
    #[sea_orm(string_value = "QR")]
    #[serde(rename = "QR")]
    Qr,
    #[sea_orm(string_value = "CODIGO_BARRAS")]
    #[serde(rename = "CODIGO_BARRAS")]
    Barcode,
    #[sea_orm(string_value = "ETIQUETA_SIMPLE")]
    #[serde(rename = "ETIQUETA_SIMPLE")]
    SimpleLabel,
    #[sea_orm(string_value = "ETIQUETA_COMPLETA")]
    #[serde(rename = "ETIQUETA_COMPLETA")]
    FullLabel,
}

impl StickerKind {
    /// File name prefix for rendered images
    pub fn file_prefix(&self) -> &'static str {
        match self {
            StickerKind::Qr => "qr",
            StickerKind::Barcode => "barcode",
            StickerKind::SimpleLabel => "simple",
            StickerKind::FullLabel => "complete",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stickers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_id: i32,
    pub kind: StickerKind,
    /// The text encoded in the image
    pub generated_code: String,
    /// Path relative to the media root
    pub image_path: Option<String>,
    pub generated_at: String,
    pub printed: bool,
    pub printed_at: Option<String>,
    pub active: bool,
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
