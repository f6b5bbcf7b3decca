//! QR matrix generation via `qrcodegen`

use qrcodegen::{QrCode, QrCodeEcc};

use super::RenderError;

/// Modules of quiet zone around the symbol
pub const BORDER: usize = 4;

/// Square module matrix (`true` = dark), border included
pub struct QrMatrix {
    pub size: usize,
    modules: Vec<bool>,
}

impl QrMatrix {
    pub fn encode(text: &str) -> Result<Self, RenderError> {
        if text.is_empty() {
            return Err(RenderError::EmptyPayload);
        }

        let code = QrCode::encode_text(text, QrCodeEcc::Medium)
            .map_err(|_| RenderError::TooLong(text.len()))?;

        let inner = code.size() as usize;
        let size = inner + 2 * BORDER;
        let mut modules = vec![false; size * size];
        for y in 0..inner {
            for x in 0..inner {
                if code.get_module(x as i32, y as i32) {
                    modules[(y + BORDER) * size + x + BORDER] = true;
                }
            }
        }

        Ok(Self { size, modules })
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.size && y < self.size && self.modules[y * self.size + x]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn border_is_light() {
        let m = QrMatrix::encode("2024LAP0001").unwrap();
        assert!(m.size > 2 * BORDER);
        for i in 0..m.size {
            assert!(!m.is_dark(i, 0));
            assert!(!m.is_dark(0, i));
        }
        // finder pattern corner
        assert!(m.is_dark(BORDER, BORDER));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let huge = "x".repeat(5000);
        assert!(matches!(QrMatrix::encode(&huge), Err(RenderError::TooLong(5000))));
    }
}
