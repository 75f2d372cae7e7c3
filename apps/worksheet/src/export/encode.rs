//! Raster encoders for single-image exports and PDF bands.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage, RgbaImage};

use crate::export::{ExportError, ExportFormat};

/// Encodes `raster` as PNG.
pub fn encode_png(raster: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut png_data = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut png_data, CompressionType::Default, FilterType::Sub);

    encoder
        .write_image(
            raster.as_raw(),
            raster.width(),
            raster.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| ExportError::AssemblyFailed(format!("PNG encoding failed: {e}")))?;

    Ok(png_data)
}

/// Encodes `raster` as baseline JPEG at `quality` (0.1–1.0), flattening alpha onto white.
pub fn encode_jpeg(raster: &RgbaImage, quality: f32) -> Result<Vec<u8>, ExportError> {
    let rgb = flatten_on_white(raster);
    let mut jpeg_data = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg_data, jpeg_quality(quality));

    encoder
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| ExportError::AssemblyFailed(format!("JPEG encoding failed: {e}")))?;

    Ok(jpeg_data)
}

/// Encodes a single-image export; documents go through the assembler instead.
pub fn encode_raster(
    raster: &RgbaImage,
    format: ExportFormat,
    quality: f32,
) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Png => encode_png(raster),
        ExportFormat::Jpeg => encode_jpeg(raster, quality),
        ExportFormat::Document => Err(ExportError::AssemblyFailed(
            "documents are assembled, not encoded".into(),
        )),
    }
}

fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

fn flatten_on_white(raster: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(raster.width(), raster.height(), |x, y| {
        let [r, g, b, a] = raster.get_pixel(x, y).0;
        let alpha = a as u16;
        let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
