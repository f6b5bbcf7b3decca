pub mod assignment;
pub mod brand;
pub mod category;
pub mod custom_data;
pub mod department;
pub mod employee;
pub mod location;
pub mod product;
pub mod product_type;
pub mod product_type_category;
pub mod stock_movement;
pub mod sticker;
pub mod supplier;
pub mod user;

pub use assignment::{AssignmentKind, ReturnReason};
pub use product::{AssetCondition, AssetState};
pub use stock_movement::MovementKind;
pub use sticker::StickerKind;

use sea_orm::{ActiveEnum, Iterable};

/// Parse a wire value (e.g. `"DISPONIBLE"`) into one of the vocabulary enums
pub fn parse_vocab<E>(raw: &str) -> Option<E>
where
    E: ActiveEnum<Value = String> + Iterable,
{
    let raw = raw.trim();
    E::iter().find(|v| v.to_value() == raw)
}
