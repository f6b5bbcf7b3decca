//! Sticker rendering
//!
//! Four sticker kinds are rendered to PNG from a [`LabelContent`]. The service
//! layer depends on the [`StickerRenderer`] trait; [`RasterRenderer`] is the
//! default implementation.

pub mod code128;
pub mod qr;
pub mod render;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::attributes::Attributes;
use crate::models::StickerKind;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("nothing to encode")]
    EmptyPayload,
    #[error("character {0:?} cannot be encoded in a barcode")]
    UnsupportedChar(char),
    #[error("payload of {0} units does not fit in the symbol")]
    TooLong(usize),
    #[error("image encoding failed: {0}")]
    Image(String),
}

/// Everything a sticker can show about one product
#[derive(Debug, Clone)]
pub struct LabelContent {
    pub serial_number: String,
    pub internal_id: String,
    /// Value printed as Code 128 (barcode if the product has one, else the serial)
    pub barcode: String,
    pub type_name: String,
    pub category: String,
    pub brand: String,
    pub model: String,
    pub custom_data: Attributes,
}

impl LabelContent {
    /// JSON payload of QR codes: identity fields followed by custom data
    pub fn qr_payload(&self) -> String {
        let mut map = Map::new();
        map.insert("numero_serie".into(), Value::from(self.serial_number.clone()));
        map.insert("tipo".into(), Value::from(self.type_name.clone()));
        map.insert("categoria".into(), Value::from(self.category.clone()));
        map.insert("marca".into(), Value::from(self.brand.clone()));
        map.insert("modelo".into(), Value::from(self.model.clone()));
        for (k, v) in &self.custom_data {
            if let Ok(v) = serde_json::to_value(v) {
                map.insert(k.clone(), v);
            }
        }
        Value::Object(map).to_string()
    }

    /// One-line summary used by the simple label
    pub fn short_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.internal_id, self.serial_number, self.brand, self.model
        )
    }

    /// The text a sticker of `kind` encodes; stored as the sticker's generated code
    pub fn code_for(&self, kind: StickerKind) -> String {
        match kind {
            StickerKind::Qr | StickerKind::FullLabel => self.qr_payload(),
            StickerKind::Barcode => self.barcode.clone(),
            StickerKind::SimpleLabel => self.short_text(),
        }
    }
}

pub trait StickerRenderer: Send + Sync {
    /// PNG bytes for one sticker
    fn render(&self, kind: StickerKind, content: &LabelContent) -> Result<Vec<u8>, RenderError>;
}

#[derive(Debug, Default, Clone)]
pub struct RasterRenderer;

impl StickerRenderer for RasterRenderer {
    fn render(&self, kind: StickerKind, content: &LabelContent) -> Result<Vec<u8>, RenderError> {
        let img = match kind {
            StickerKind::Qr => render::qr_image(&content.qr_payload())?,
            StickerKind::Barcode => render::barcode_image(&content.barcode)?,
            StickerKind::SimpleLabel => {
                render::simple_label(&content.barcode, &content.short_text())?
            }
            StickerKind::FullLabel => render::full_label(&content.barcode, &content.qr_payload())?,
        };
        render::encode_png(&img)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::attributes::AttributeValue;

    fn content() -> LabelContent {
        let mut custom_data = Attributes::new();
        custom_data.insert("ram".into(), AttributeValue::Number(16.0));
        LabelContent {
            serial_number: "2024LAP0001".into(),
            internal_id: "LAP0001".into(),
            barcode: "2024LAP0001".into(),
            type_name: "Portátil".into(),
            category: "Laptops".into(),
            brand: "Dell".into(),
            model: "Latitude 5440".into(),
            custom_data,
        }
    }

    #[test]
    fn qr_payload_includes_custom_data() {
        let payload: Value = serde_json::from_str(&content().qr_payload()).unwrap();
        assert_eq!(payload["numero_serie"], "2024LAP0001");
        assert_eq!(payload["marca"], "Dell");
        assert_eq!(payload["ram"], 16.0);
    }

    #[test]
    fn every_kind_renders() {
        let renderer = RasterRenderer;
        for kind in [
            StickerKind::Qr,
            StickerKind::Barcode,
            StickerKind::SimpleLabel,
            StickerKind::FullLabel,
        ] {
            let png = renderer.render(kind, &content()).unwrap();
            assert!(png.starts_with(b"\x89PNG"), "{:?}", kind);
        }
    }

    #[test]
    fn non_ascii_barcode_fails() {
        let mut c = content();
        c.barcode = "Nº1".into();
        assert!(RasterRenderer.render(StickerKind::Barcode, &c).is_err());
        // the QR path handles any text
        assert!(RasterRenderer.render(StickerKind::Qr, &c).is_ok());
    }
}
