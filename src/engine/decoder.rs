// src/engine/decoder.rs
//
// Decode routing: JPEG via mozjpeg, PNG via zune-png, WebP via libwebp,
// everything else via the image crate. Dimension guards run before any
// full decode.

use crate::error::{BatchResizeError, Result};
use image::{
    DynamicImage, GrayAlphaImage, GrayImage, ImageFormat, ImageReader, RgbImage, RgbaImage,
};
use mozjpeg::Decompress;
use std::io::Cursor;
use webp::{BitstreamFeatures, Decoder as WebPDecoder};
use zune_core::bytestream::ZCursor;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_png::PngDecoder;

use super::common::run_with_panic_policy;
use super::{MAX_DIMENSION, MAX_PIXELS};

/// Reject dimensions that indicate a decompression bomb.
pub fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(BatchResizeError::dimension_exceeds_limit(
            width.max(height),
            MAX_DIMENSION,
        ));
    }
    let pixels = width as u64 * height as u64;
    if pixels > MAX_PIXELS {
        return Err(BatchResizeError::pixel_count_exceeds_limit(
            pixels, MAX_PIXELS,
        ));
    }
    Ok(())
}

/// Probe the header and ensure dimensions are safe before decoding.
/// Unreadable headers pass through; the decoder reports those properly.
pub fn ensure_dimensions_safe(bytes: &[u8]) -> Result<()> {
    let cursor = Cursor::new(bytes);
    if let Ok(reader) = ImageReader::new(cursor).with_guessed_format() {
        if let Ok((width, height)) = reader.into_dimensions() {
            return check_dimensions(width, height);
        }
    }
    Ok(())
}

/// Detect input format from magic bytes. Returns None if unknown.
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Unified decode entrypoint: detect format once, route to the
/// fastest decoder for it.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    match detect_format(bytes) {
        Some(ImageFormat::Jpeg) => decode_jpeg_mozjpeg(bytes),
        Some(ImageFormat::Png) => decode_png_zune(bytes),
        Some(ImageFormat::WebP) => decode_webp_libwebp(bytes),
        _ => decode_with_image_crate(bytes),
    }
}

/// Decode JPEG using mozjpeg (backed by libjpeg-turbo).
/// Fatal libjpeg errors unwind as panics, so the body runs under the
/// panic policy guard.
fn decode_jpeg_mozjpeg(data: &[u8]) -> Result<DynamicImage> {
    run_with_panic_policy("decode:mozjpeg", || {
        // Truncated files make libjpeg emit warnings and garbage output
        if !data.windows(2).any(|pair| pair == [0xFF, 0xD9]) {
            return Err(BatchResizeError::decode_failed(
                "mozjpeg: missing JPEG EOI marker",
            ));
        }

        let decompress = Decompress::new_mem(data).map_err(|e| {
            BatchResizeError::decode_failed(format!("mozjpeg decompress init failed: {e:?}"))
        })?;

        let mut decompress = decompress.rgb().map_err(|e| {
            BatchResizeError::decode_failed(format!("mozjpeg rgb conversion failed: {e:?}"))
        })?;

        let width = decompress.width() as u32;
        let height = decompress.height() as u32;
        check_dimensions(width, height)?;

        let pixels: Vec<[u8; 3]> = decompress.read_scanlines().map_err(|e| {
            BatchResizeError::decode_failed(format!("mozjpeg: failed to read scanlines: {e:?}"))
        })?;

        let flat_pixels: Vec<u8> = pixels.into_iter().flatten().collect();

        let rgb_image = RgbImage::from_raw(width, height, flat_pixels).ok_or_else(|| {
            BatchResizeError::decode_failed("mozjpeg: failed to create image from raw data")
        })?;

        Ok(DynamicImage::ImageRgb8(rgb_image))
    })
}

/// Decode PNG using zune-png. 16-bit input is stripped to 8-bit.
fn decode_png_zune(data: &[u8]) -> Result<DynamicImage> {
    let options = DecoderOptions::default().png_set_strip_to_8bit(true);
    let mut decoder = PngDecoder::new_with_options(ZCursor::new(data), options);
    let pixels = decoder
        .decode()
        .map_err(|e| BatchResizeError::decode_failed(format!("png: decode failed: {e}")))?;

    let (width, height) = decoder
        .dimensions()
        .ok_or_else(|| BatchResizeError::decode_failed("png: missing header info"))?;

    let width = width as u32;
    let height = height as u32;
    check_dimensions(width, height)?;

    let buf = match pixels {
        zune_core::result::DecodingResult::U8(v) => v,
        _ => {
            return Err(BatchResizeError::decode_failed(
                "png: unexpected non-U8 pixel buffer",
            ))
        }
    };

    let colorspace = decoder
        .colorspace()
        .ok_or_else(|| BatchResizeError::decode_failed("png: missing colorspace"))?;

    let img = match colorspace {
        ColorSpace::RGB => RgbImage::from_raw(width, height, buf)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| BatchResizeError::decode_failed("png: failed to build RGB image"))?,
        ColorSpace::RGBA | ColorSpace::YCbCr | ColorSpace::BGRA | ColorSpace::ARGB => {
            RgbaImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageRgba8)
                .ok_or_else(|| {
                    BatchResizeError::decode_failed("png: failed to build RGBA image")
                })?
        }
        ColorSpace::Luma => GrayImage::from_raw(width, height, buf)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(|| BatchResizeError::decode_failed("png: failed to build Luma image"))?,
        ColorSpace::LumaA => GrayAlphaImage::from_raw(width, height, buf)
            .map(DynamicImage::ImageLumaA8)
            .ok_or_else(|| BatchResizeError::decode_failed("png: failed to build LumaA image"))?,
        other => {
            return Err(BatchResizeError::decode_failed(format!(
                "png: unsupported colorspace {:?}",
                other
            )))
        }
    };

    Ok(img)
}

/// Decode WebP using libwebp. Animated WebP falls back to the image crate.
fn decode_webp_libwebp(data: &[u8]) -> Result<DynamicImage> {
    run_with_panic_policy("decode:webp", || {
        // Parse header first to avoid allocating huge buffers on malformed files
        let features = BitstreamFeatures::new(data).ok_or_else(|| {
            BatchResizeError::decode_failed("webp: failed to read bitstream features")
        })?;

        if features.has_animation() {
            return image::load_from_memory(data).map_err(|e| {
                BatchResizeError::decode_failed(format!("webp (animated) decode failed: {e}"))
            });
        }

        check_dimensions(features.width(), features.height())?;

        let decoder = WebPDecoder::new(data);
        let decoded = decoder
            .decode()
            .ok_or_else(|| BatchResizeError::decode_failed("webp: decode failed"))?;

        Ok(decoded.to_image())
    })
}

/// Decode remaining formats (gif, bmp, ...) using the image crate.
fn decode_with_image_crate(data: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(data)
        .map_err(|e| BatchResizeError::decode_failed(format!("decode failed: {e}")))
}

/// Extract EXIF Orientation tag (1-8). Returns None if missing or invalid.
pub fn detect_exif_orientation(bytes: &[u8]) -> Option<u16> {
    let mut cursor = Cursor::new(bytes);
    let exif_reader = exif::Reader::new();
    let exif = exif_reader.read_from_container(&mut cursor).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    // exif crate can represent as Short/Long; use get_uint for safety
    let value = field.value.get_uint(0)?;
    let orientation = value as u16;
    if (1..=8).contains(&orientation) {
        Some(orientation)
    } else {
        None
    }
}
