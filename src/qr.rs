use image::{imageops, GrayImage, Luma};
use qrcode::{Color, QrCode};

use crate::error::Result;

#[cfg(feature = "decode")]
use anyhow::anyhow;
#[cfg(feature = "decode")]
use image::DynamicImage;
#[cfg(feature = "decode")]
use rqrr::PreparedImage;
#[cfg(feature = "decode")]
use std::path::Path;

/// Light modules around the symbol, per side.
const QUIET_ZONE: usize = 4;

/// A rendered QR code and the payload it was rendered from.
///
/// This is the handle the export path reads from, so a download always
/// serializes exactly what is on screen.
#[derive(Debug, Clone)]
pub struct QrSurface {
    payload: String,
    width: usize,
    colors: Vec<Color>,
    image: GrayImage,
}

impl QrSurface {
    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Number of modules per side, without the quiet zone.
    pub fn modules(&self) -> usize {
        self.width
    }
}

/// Encodes `payload` with the encoder's default error correction and renders
/// it centered on a white `size`×`size` canvas.
///
/// Modules are a whole number of pixels wide. When the symbol does not fit at
/// one pixel per module the canvas grows to the symbol's size.
pub fn render_qr(payload: &str, size: u32) -> Result<QrSurface> {
    let code = QrCode::new(payload.as_bytes())?;
    let width = code.width();

    let span = (width + 2 * QUIET_ZONE) as u32;
    let module = (size / span).max(1);

    let symbol = code
        .render::<Luma<u8>>()
        .quiet_zone(true)
        .module_dimensions(module, module)
        .build();

    let side = size.max(symbol.width());
    let mut image = GrayImage::from_pixel(side, side, Luma([255]));
    let offset = i64::from((side - symbol.width()) / 2);
    imageops::overlay(&mut image, &symbol, offset, offset);

    tracing::debug!(
        modules = width,
        module_px = module,
        side,
        version = ?code.version(),
        "rendered QR surface"
    );

    Ok(QrSurface {
        payload: payload.to_string(),
        width,
        colors: code.to_colors(),
        image,
    })
}

#[cfg(not(target_arch = "wasm32"))]
impl QrSurface {
    /// Renders the symbol with half-block characters, two module rows per
    /// line, centered horizontally in the current terminal.
    pub fn to_terminal(&self) -> String {
        use terminal_size::{terminal_size, Width};

        let qr_size = self.width;
        let qr_with_quiet = qr_size + 2 * QUIET_ZONE;

        let term_width = terminal_size()
            .map(|(Width(w), _)| w as usize)
            .unwrap_or(80);
        let left_pad = " ".repeat(term_width.saturating_sub(qr_with_quiet) / 2);

        let is_dark = |row: usize, col: usize| -> bool {
            if (QUIET_ZONE..qr_size + QUIET_ZONE).contains(&row)
                && (QUIET_ZONE..qr_size + QUIET_ZONE).contains(&col)
            {
                self.colors[(row - QUIET_ZONE) * qr_size + (col - QUIET_ZONE)] == Color::Dark
            } else {
                false
            }
        };

        let mut result = String::new();
        for pair in 0..(qr_with_quiet + 1) / 2 {
            let top_row = pair * 2;
            let bottom_row = top_row + 1;

            result.push_str(&left_pad);
            for col in 0..qr_with_quiet {
                let top_dark = is_dark(top_row, col);
                let bottom_dark = bottom_row < qr_with_quiet && is_dark(bottom_row, col);

                result.push(match (top_dark, bottom_dark) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                });
            }
            result.push('\n');
        }

        result
    }
}

#[cfg(feature = "decode")]
pub fn decode_qr_image(path: &Path) -> anyhow::Result<String> {
    let img = image::open(path)?;
    decode_qr_from_dynamic_image(&img)
}

#[cfg(feature = "decode")]
pub fn decode_qr_png(bytes: &[u8]) -> anyhow::Result<String> {
    let img = image::load_from_memory(bytes)?;
    decode_qr_from_dynamic_image(&img)
}

#[cfg(feature = "decode")]
pub fn decode_qr_from_dynamic_image(img: &DynamicImage) -> anyhow::Result<String> {
    decode_qr_from_gray(&img.to_luma8())
}

#[cfg(feature = "decode")]
pub fn decode_qr_from_gray(gray: &GrayImage) -> anyhow::Result<String> {
    let mut prepared = PreparedImage::prepare(gray.clone());
    let grids = prepared.detect_grids();

    let grid = grids
        .first()
        .ok_or_else(|| anyhow!("No QR code found in image"))?;

    let (_, content) = grid
        .decode()
        .map_err(|e| anyhow!("Failed to decode QR code: {:?}", e))?;

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_has_requested_size() {
        let surface = render_qr("blob:snapqr/0123456789abcdef-1", 200).unwrap();
        assert_eq!(surface.dimensions(), (200, 200));
        assert_eq!(surface.payload(), "blob:snapqr/0123456789abcdef-1");
    }

    #[test]
    fn test_surface_grows_when_symbol_does_not_fit() {
        let surface = render_qr("hello", 10).unwrap();
        let side = (surface.modules() + 2 * QUIET_ZONE) as u32;
        assert_eq!(surface.dimensions(), (side, side));
    }

    #[test]
    fn test_canvas_corners_are_light() {
        let surface = render_qr("corner check", 200).unwrap();
        let img = surface.image();
        assert_eq!(img.get_pixel(0, 0), &Luma([255]));
        assert_eq!(img.get_pixel(199, 199), &Luma([255]));
    }

    #[test]
    fn test_oversized_payload_is_an_encode_error() {
        let payload = "x".repeat(8000);
        assert!(matches!(
            render_qr(&payload, 200),
            Err(crate::Error::Encode(_))
        ));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_terminal_rendering() {
        let surface = render_qr("terminal", 200).unwrap();
        let text = surface.to_terminal();
        assert!(text.contains('█'));
        assert_eq!(
            text.lines().count(),
            (surface.modules() + 2 * QUIET_ZONE + 1) / 2
        );
    }

    #[cfg(feature = "decode")]
    #[test]
    fn test_qr_roundtrip() {
        let payload = "blob:snapqr/feedfacecafebeef-42";
        let surface = render_qr(payload, 200).unwrap();

        let decoded = decode_qr_from_gray(surface.image()).unwrap();
        assert_eq!(decoded, payload);
    }
}
