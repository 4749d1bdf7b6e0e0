// src/engine/encoder.rs
//
// Per-format color normalization and encoding:
// - jpeg: alpha composited onto white, RGB8, mozjpeg with optimized coding
// - png: RGB8/RGBA8 (others widened to RGBA8), oxipng lossless pass
// - webp: RGB8/RGBA8 (others flattened to RGB8), libwebp method 6

use crate::error::{BatchResizeError, Result};
use crate::request::OutputFormat;
use image::{DynamicImage, ImageFormat, RgbImage};
use mozjpeg::{ColorSpace, Compress, ScanMode};
use std::borrow::Cow;
use std::io::Cursor;

use super::common::run_with_panic_policy;
use super::MAX_DIMENSION;

/// Encode `img` in the requested format after normalizing its color mode.
pub fn encode(img: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Jpeg => encode_jpeg(img, quality),
        OutputFormat::Png => encode_png(img),
        OutputFormat::Webp => encode_webp(img, quality),
    }
}

/// Composite an image with alpha onto an opaque white background.
/// Alpha-free inputs convert straight to RGB8.
fn flatten_onto_white(img: &DynamicImage) -> Cow<'_, RgbImage> {
    match img {
        DynamicImage::ImageRgb8(rgb) => Cow::Borrowed(rgb),
        img if !img.color().has_alpha() => Cow::Owned(img.to_rgb8()),
        img => {
            let rgba = img.to_rgba8();
            let (w, h) = rgba.dimensions();
            let mut flat = RgbImage::new(w, h);
            for (src, dst) in rgba.pixels().zip(flat.pixels_mut()) {
                let alpha = src[3] as u32;
                for channel in 0..3 {
                    // src over white, rounded
                    let value = src[channel] as u32 * alpha + 255 * (255 - alpha);
                    dst[channel] = ((value + 127) / 255) as u8;
                }
            }
            Cow::Owned(flat)
        }
    }
}

/// Encode to JPEG using mozjpeg with an optimized-coding size pass.
/// Runs under the panic policy guard; fatal libjpeg errors unwind as
/// panics.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    run_with_panic_policy("encode:jpeg", || {
        let quality = quality.min(100);
        let rgb = flatten_onto_white(img);
        let (w, h) = rgb.dimensions();
        let pixels: &[u8] = rgb.as_raw();

        if w == 0 || h == 0 {
            return Err(BatchResizeError::encode_failed(
                "jpeg",
                "invalid image dimensions: width or height is zero",
            ));
        }
        if w > MAX_DIMENSION || h > MAX_DIMENSION {
            return Err(BatchResizeError::dimension_exceeds_limit(
                w.max(h),
                MAX_DIMENSION,
            ));
        }

        let mut comp = Compress::new(ColorSpace::JCS_RGB);
        comp.set_size(w as usize, h as usize);
        comp.set_color_space(ColorSpace::JCS_YCbCr);
        comp.set_quality(quality as f32);
        comp.set_chroma_sampling_pixel_sizes((2, 2), (2, 2));
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);
        comp.set_optimize_scans(true);
        comp.set_scan_optimization_mode(ScanMode::AllComponentsTogether);

        let estimated_size = (w as usize * h as usize * 3 / 10).max(4096);
        let mut output = Vec::with_capacity(estimated_size);

        let mut writer = comp.start_compress(&mut output).map_err(|e| {
            BatchResizeError::encode_failed(
                "jpeg",
                format!("mozjpeg: failed to start compress: {e:?}"),
            )
        })?;

        let stride = w as usize * 3;
        for row in pixels.chunks(stride) {
            writer.write_scanlines(row).map_err(|e| {
                BatchResizeError::encode_failed(
                    "jpeg",
                    format!("mozjpeg: failed to write scanlines: {e:?}"),
                )
            })?;
        }

        writer.finish().map_err(|e| {
            BatchResizeError::encode_failed("jpeg", format!("mozjpeg: failed to finish: {e:?}"))
        })?;

        Ok(output)
    })
}

/// Encode to PNG, then run oxipng for a lossless size-optimization pass.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>> {
    // PNG keeps alpha; anything that is not RGB8/RGBA8 widens to RGBA8
    let normalized: Cow<'_, DynamicImage> = match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => Cow::Borrowed(img),
        other => Cow::Owned(DynamicImage::ImageRgba8(other.to_rgba8())),
    };

    let mut buf = Vec::new();
    normalized
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| BatchResizeError::encode_failed("png", format!("PNG encode failed: {e}")))?;

    // Reductions would undo the color-mode normalization above (RGBA8
    // sources without meaningful alpha come back grayscale/indexed),
    // so only the filter/deflate search of the preset is kept.
    let mut options = oxipng::Options::from_preset(4);
    options.color_type_reduction = false;
    options.grayscale_reduction = false;
    options.palette_reduction = false;
    options.bit_depth_reduction = false;
    oxipng::optimize_from_memory(&buf, &options).map_err(|e| {
        BatchResizeError::encode_failed("png", format!("oxipng optimization failed: {e}"))
    })
}

/// Encode to WebP at maximum compression effort (method 6).
pub fn encode_webp(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    run_with_panic_policy("encode:webp", || {
        let quality = quality.min(100);

        let mut config = webp::WebPConfig::new()
            .map_err(|_| BatchResizeError::encode_failed("webp", "failed to create WebPConfig"))?;
        config.quality = quality as f32;
        config.method = 6;

        // WebP keeps alpha only when the source already carries it
        let encoded = match img {
            DynamicImage::ImageRgba8(rgba) => {
                let (w, h) = rgba.dimensions();
                let encoder = webp::Encoder::from_rgba(rgba.as_raw(), w, h);
                encoder.encode_advanced(&config)
            }
            img if img.color().has_alpha() => {
                let rgba = img.to_rgba8();
                let (w, h) = rgba.dimensions();
                let encoder = webp::Encoder::from_rgba(rgba.as_raw(), w, h);
                encoder.encode_advanced(&config)
            }
            img => {
                let rgb = img.to_rgb8();
                let (w, h) = rgb.dimensions();
                let encoder = webp::Encoder::from_rgb(rgb.as_raw(), w, h);
                encoder.encode_advanced(&config)
            }
        };

        encoded.map(|mem| mem.to_vec()).map_err(|e| {
            BatchResizeError::encode_failed("webp", format!("WebP encode failed: {e:?}"))
        })
    })
}
