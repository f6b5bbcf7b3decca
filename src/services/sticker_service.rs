//! Sticker Service - identification stickers rendered from product data
//!
//! Stickers are derived artifacts: every generation appends a new row and a new
//! PNG under `<media_root>/pegatinas/`, and a sticker whose file went missing is
//! simply rendered again.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sea_orm::*;
use serde::Serialize;
use std::path::Path;

use super::Actor;
use crate::domain::DomainError;
use crate::domain::attributes::{Attributes, parse_attributes};
use crate::labels::{LabelContent, StickerRenderer};
use crate::models::product::{self, Entity as Product};
use crate::models::sticker::{self, Entity as Sticker, StickerKind};
use crate::models::{brand, category, custom_data, parse_vocab, product_type};
use crate::utils::dates::now_rfc3339;

const STICKER_DIR: &str = "pegatinas";

#[derive(Debug, Serialize)]
pub struct PrintableSticker {
    #[serde(flatten)]
    pub sticker: sticker::Model,
    /// `data:image/png;base64,...`
    pub image: String,
}

fn file_safe(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Collect what a sticker prints about `product`
pub async fn label_content(
    db: &DatabaseConnection,
    product: &product::Model,
) -> Result<LabelContent, DomainError> {
    let category = category::Entity::find_by_id(product.category_id)
        .one(db)
        .await?
        .map(|c| c.name)
        .unwrap_or_default();
    let brand = brand::Entity::find_by_id(product.brand_id)
        .one(db)
        .await?
        .map(|b| b.name)
        .unwrap_or_default();

    let custom = custom_data::Entity::find()
        .filter(custom_data::Column::ProductId.eq(product.id))
        .find_also_related(product_type::Entity)
        .one(db)
        .await?;
    let (type_name, custom_data) = match custom {
        Some((row, ptype)) => (
            ptype.map(|t| t.name).unwrap_or_else(|| category.clone()),
            parse_attributes(&row.data),
        ),
        None => (category.clone(), Attributes::new()),
    };

    Ok(LabelContent {
        serial_number: product.serial_number.clone(),
        internal_id: product.internal_id.clone(),
        barcode: product
            .barcode
            .clone()
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| product.serial_number.clone()),
        type_name,
        category,
        brand,
        model: product.model.clone(),
        custom_data,
    })
}

async fn write_png(
    media_root: &Path,
    kind: StickerKind,
    serial: &str,
    png: &[u8],
) -> Result<String, DomainError> {
    let relative = format!(
        "{}/{}_{}_{}_{}.png",
        STICKER_DIR,
        kind.file_prefix(),
        file_safe(serial),
        chrono::Utc::now().format("%Y%m%d_%H%M%S"),
        &uuid::Uuid::new_v4().simple().to_string()[..8]
    );
    let target = media_root.join(&relative);
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, png).await?;
    Ok(relative)
}

/// Render and store one sticker per requested kind.
///
/// Unknown kinds are skipped. A kind that fails to render is logged and
/// skipped; the call fails only when nothing could be generated.
pub async fn generate(
    db: &DatabaseConnection,
    renderer: &dyn StickerRenderer,
    media_root: &Path,
    product_id: i32,
    kinds: &[String],
    actor: &Actor,
) -> Result<Vec<sticker::Model>, DomainError> {
    let product = Product::find_by_id(product_id)
        .filter(product::Column::Active.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Product"))?;

    let requested: Vec<StickerKind> = if kinds.is_empty() {
        vec![StickerKind::Qr]
    } else {
        kinds
            .iter()
            .filter_map(|raw| {
                let kind = parse_vocab::<StickerKind>(raw);
                if kind.is_none() {
                    tracing::warn!(kind = %raw, "skipping unknown sticker kind");
                }
                kind
            })
            .collect()
    };

    let content = label_content(db, &product).await?;
    let mut created = Vec::new();

    for kind in requested {
        let png = match renderer.render(kind, &content) {
            Ok(png) => png,
            Err(e) => {
                tracing::error!(kind = %kind.to_value(), serial = %product.serial_number, error = %e, "sticker rendering failed");
                continue;
            }
        };
        let path = match write_png(media_root, kind, &product.serial_number, &png).await {
            Ok(path) => path,
            Err(e) => {
                tracing::error!(kind = %kind.to_value(), error = %e, "could not store sticker image");
                continue;
            }
        };

        let saved = sticker::ActiveModel {
            product_id: Set(product.id),
            kind: Set(kind),
            generated_code: Set(content.code_for(kind)),
            image_path: Set(Some(path)),
            generated_at: Set(now_rfc3339()),
            printed: Set(false),
            printed_at: Set(None),
            active: Set(true),
            ..Default::default()
        }
        .insert(db)
        .await?;
        created.push(saved);
    }

    if created.is_empty() {
        return Err(DomainError::FileOperation(
            "No sticker could be generated".to_string(),
        ));
    }

    tracing::info!(
        user = %actor.username,
        action = "STICKERS_GENERATED",
        serial = %product.serial_number,
        count = created.len(),
    );
    Ok(created)
}

pub async fn list_for_product(
    db: &DatabaseConnection,
    product_id: i32,
) -> Result<Vec<sticker::Model>, DomainError> {
    Ok(Sticker::find()
        .filter(sticker::Column::ProductId.eq(product_id))
        .filter(sticker::Column::Active.eq(true))
        .order_by_desc(sticker::Column::GeneratedAt)
        .order_by_desc(sticker::Column::Id)
        .all(db)
        .await?)
}

async fn find_active(db: &DatabaseConnection, id: i32) -> Result<sticker::Model, DomainError> {
    Sticker::find_by_id(id)
        .filter(sticker::Column::Active.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Sticker"))
}

/// PNG bytes of a sticker; re-rendered (and the row repointed) if the file is gone
async fn image_bytes(
    db: &DatabaseConnection,
    renderer: &dyn StickerRenderer,
    media_root: &Path,
    sticker: sticker::Model,
) -> Result<(sticker::Model, Vec<u8>), DomainError> {
    if let Some(path) = sticker.image_path.clone() {
        match tokio::fs::read(media_root.join(&path)).await {
            Ok(bytes) => return Ok((sticker, bytes)),
            Err(e) => tracing::warn!(path = %path, error = %e, "sticker image missing, rendering again"),
        }
    }

    let product = Product::find_by_id(sticker.product_id)
        .one(db)
        .await?
        .ok_or_else(|| DomainError::not_found("Product"))?;
    let content = label_content(db, &product).await?;
    let png = renderer
        .render(sticker.kind, &content)
        .map_err(|e| DomainError::FileOperation(e.to_string()))?;
    let path = write_png(media_root, sticker.kind, &product.serial_number, &png).await?;

    let mut active: sticker::ActiveModel = sticker.into();
    active.image_path = Set(Some(path));
    let sticker = active.update(db).await?;
    Ok((sticker, png))
}

pub async fn printable(
    db: &DatabaseConnection,
    renderer: &dyn StickerRenderer,
    media_root: &Path,
    id: i32,
) -> Result<PrintableSticker, DomainError> {
    let sticker = find_active(db, id).await?;
    let (sticker, png) = image_bytes(db, renderer, media_root, sticker).await?;
    Ok(PrintableSticker {
        sticker,
        image: format!("data:image/png;base64,{}", STANDARD.encode(&png)),
    })
}

/// File name and PNG bytes for a download
pub async fn download(
    db: &DatabaseConnection,
    renderer: &dyn StickerRenderer,
    media_root: &Path,
    id: i32,
) -> Result<(String, Vec<u8>), DomainError> {
    let sticker = find_active(db, id).await?;
    let (sticker, png) = image_bytes(db, renderer, media_root, sticker).await?;
    let filename = sticker
        .image_path
        .as_deref()
        .and_then(|p| Path::new(p).file_name())
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("sticker_{}.png", sticker.id));
    Ok((filename, png))
}

pub async fn mark_printed(
    db: &DatabaseConnection,
    id: i32,
    actor: &Actor,
) -> Result<sticker::Model, DomainError> {
    let sticker = find_active(db, id).await?;
    let mut active: sticker::ActiveModel = sticker.into();
    active.printed = Set(true);
    active.printed_at = Set(Some(now_rfc3339()));
    let saved = active.update(db).await?;

    tracing::info!(user = %actor.username, action = "STICKER_PRINTED", sticker_id = id);
    Ok(saved)
}

async fn remove_file(media_root: &Path, path: Option<&str>) {
    let Some(path) = path else { return };
    if let Err(e) = tokio::fs::remove_file(media_root.join(path)).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path, error = %e, "could not remove sticker image");
        }
    }
}

/// Deactivate a sticker and remove its image
pub async fn delete(
    db: &DatabaseConnection,
    media_root: &Path,
    id: i32,
    actor: &Actor,
) -> Result<(), DomainError> {
    let sticker = find_active(db, id).await?;
    let path = sticker.image_path.clone();

    let mut active: sticker::ActiveModel = sticker.into();
    active.active = Set(false);
    active.update(db).await?;
    remove_file(media_root, path.as_deref()).await;

    tracing::info!(user = %actor.username, action = "STICKER_DELETED", sticker_id = id);
    Ok(())
}

/// Deactivate the stickers of retired products and remove their images.
/// Returns how many stickers were swept.
pub async fn sweep(db: &DatabaseConnection, media_root: &Path) -> Result<usize, DomainError> {
    let orphaned = Sticker::find()
        .inner_join(Product)
        .filter(sticker::Column::Active.eq(true))
        .filter(product::Column::Active.eq(false))
        .all(db)
        .await?;

    if orphaned.is_empty() {
        return Ok(0);
    }

    let ids: Vec<i32> = orphaned.iter().map(|s| s.id).collect();
    Sticker::update_many()
        .col_expr(sticker::Column::Active, sea_orm::sea_query::Expr::value(false))
        .filter(sticker::Column::Id.is_in(ids))
        .exec(db)
        .await?;

    for sticker in &orphaned {
        remove_file(media_root, sticker.image_path.as_deref()).await;
    }

    tracing::info!(count = orphaned.len(), "swept stickers of retired products");
    Ok(orphaned.len())
}
