//! Raster composition of sticker images with the `image` crate

use image::{GrayImage, ImageFormat, Luma};
use std::io::Cursor;

use super::qr::QrMatrix;
use super::{RenderError, code128};

const WHITE: Luma<u8> = Luma([255]);
const BLACK: Luma<u8> = Luma([0]);

pub fn blank(width: u32, height: u32) -> GrayImage {
    GrayImage::from_pixel(width, height, WHITE)
}

fn fill_rect(img: &mut GrayImage, x: u32, y: u32, w: u32, h: u32) {
    let (max_x, max_y) = img.dimensions();
    for py in y..(y + h).min(max_y) {
        for px in x..(x + w).min(max_x) {
            img.put_pixel(px, py, BLACK);
        }
    }
}

/// Draw a QR matrix with its top-left corner at (x, y), `scale` pixels per module
pub fn draw_qr(img: &mut GrayImage, matrix: &QrMatrix, x: u32, y: u32, scale: u32) {
    for my in 0..matrix.size {
        for mx in 0..matrix.size {
            if matrix.is_dark(mx, my) {
                fill_rect(
                    img,
                    x + mx as u32 * scale,
                    y + my as u32 * scale,
                    scale,
                    scale,
                );
            }
        }
    }
}

/// Draw barcode modules into a `width` x `height` box, centred horizontally.
/// Fails when the symbol can't fit at one pixel per module.
pub fn draw_barcode(
    img: &mut GrayImage,
    modules: &[bool],
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> Result<(), RenderError> {
    let count = modules.len() as u32;
    let scale = width / count.max(1);
    if scale == 0 {
        return Err(RenderError::TooLong(modules.len()));
    }

    let offset = x + (width - count * scale) / 2;
    for (i, bar) in modules.iter().enumerate() {
        if *bar {
            fill_rect(img, offset + i as u32 * scale, y, scale, height);
        }
    }
    Ok(())
}

/// Standalone QR image, 8 pixels per module
pub fn qr_image(text: &str) -> Result<GrayImage, RenderError> {
    let matrix = QrMatrix::encode(text)?;
    let scale = 8;
    let side = matrix.size as u32 * scale;
    let mut img = blank(side, side);
    draw_qr(&mut img, &matrix, 0, 0, scale);
    Ok(img)
}

/// Standalone Code 128 image, 2 pixels per module, 100 pixels tall
pub fn barcode_image(text: &str) -> Result<GrayImage, RenderError> {
    let modules = code128::encode(text)?;
    let width = modules.len() as u32 * 2;
    let mut img = blank(width, 100);
    draw_barcode(&mut img, &modules, 0, 0, width, 100)?;
    Ok(img)
}

/// 400x200: barcode on the left, small QR of the short text on the right
pub fn simple_label(barcode: &str, short_text: &str) -> Result<GrayImage, RenderError> {
    let mut img = blank(400, 200);

    let modules = code128::encode(barcode)?;
    draw_barcode(&mut img, &modules, 10, 40, 250, 120)?;

    let matrix = QrMatrix::encode(short_text)?;
    let scale = (120 / matrix.size as u32).max(1);
    draw_qr(&mut img, &matrix, 270, 40, scale);

    Ok(img)
}

/// 600x400: title rule, QR of the full payload, barcode along the bottom
pub fn full_label(barcode: &str, payload: &str) -> Result<GrayImage, RenderError> {
    let mut img = blank(600, 400);

    fill_rect(&mut img, 20, 44, 560, 2);

    let matrix = QrMatrix::encode(payload)?;
    let scale = (260 / matrix.size as u32).max(1);
    draw_qr(&mut img, &matrix, 20, 60, scale);

    let modules = code128::encode(barcode)?;
    draw_barcode(&mut img, &modules, 20, 330, 560, 50)?;

    Ok(img)
}

pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>, RenderError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| RenderError::Image(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barcode_image_has_bars() {
        let img = barcode_image("2024LAP0001").unwrap();
        assert_eq!(img.height(), 100);
        // first module after the quiet zone is a bar
        let x = code128::QUIET_ZONE as u32 * 2;
        assert_eq!(img.get_pixel(x, 50), &BLACK);
        assert_eq!(img.get_pixel(0, 50), &WHITE);
    }

    #[test]
    fn label_sizes() {
        let simple = simple_label("2024LAP0001", "LAP0001 Dell Latitude").unwrap();
        assert_eq!(simple.dimensions(), (400, 200));

        let full = full_label("2024LAP0001", r#"{"numero_serie":"2024LAP0001"}"#).unwrap();
        assert_eq!(full.dimensions(), (600, 400));
        assert_eq!(full.get_pixel(100, 45), &BLACK);
    }

    #[test]
    fn barcode_too_long_for_simple_label() {
        let long = "X".repeat(40);
        assert!(matches!(
            simple_label(&long, "short"),
            Err(RenderError::TooLong(_))
        ));
    }

    #[test]
    fn png_signature() {
        let png = encode_png(&qr_image("hello").unwrap()).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
