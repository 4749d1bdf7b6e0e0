// src/engine/pipeline.rs
//
// Geometry for the three scaling policies, EXIF auto-orient, and the
// SIMD resample path (fast_image_resize, Lanczos3) with an image-crate
// fallback.

use crate::error::{BatchResizeError, Result};
use fast_image_resize::{self as fir, ImageBufferError, MulDiv, PixelType, ResizeOptions};
use image::{imageops::FilterType, DynamicImage, RgbImage, RgbaImage};

/// Dimensions for `fit`: uniform scale-down inside the bound, never
/// upscaling. Sources already inside the bound keep their size.
pub fn fit_dimensions(orig_w: u32, orig_h: u32, bound_w: u32, bound_h: u32) -> (u32, u32) {
    if orig_w <= bound_w && orig_h <= bound_h {
        return (orig_w, orig_h);
    }
    let scale_w = bound_w as f64 / orig_w as f64;
    let scale_h = bound_h as f64 / orig_h as f64;
    let scale = scale_w.min(scale_h);
    let w = ((orig_w as f64 * scale).round() as u32).clamp(1, bound_w);
    let h = ((orig_h as f64 * scale).round() as u32).clamp(1, bound_h);
    (w, h)
}

/// Source-space window for `crop`: the largest centered region with
/// the bound's aspect ratio. The window never exceeds the source, so
/// cropping before resampling keeps the intermediate buffer bounded by
/// the source size even for extreme aspect ratios.
pub fn cover_window(orig_w: u32, orig_h: u32, bound_w: u32, bound_h: u32) -> (u32, u32) {
    if orig_w == 0 || orig_h == 0 {
        return (orig_w.max(1), orig_h.max(1));
    }
    let src_ratio = orig_w as f64 / orig_h as f64;
    let bound_ratio = bound_w as f64 / bound_h as f64;
    if src_ratio > bound_ratio {
        let w = ((orig_h as f64 * bound_ratio).round() as u32).clamp(1, orig_w);
        (w, orig_h)
    } else {
        let h = ((orig_w as f64 / bound_ratio).round() as u32).clamp(1, orig_h);
        (orig_w, h)
    }
}

/// Crop the centered `target_w` x `target_h` window out of `img`.
pub fn center_crop(img: DynamicImage, target_w: u32, target_h: u32) -> DynamicImage {
    let crop_width = target_w.min(img.width()).max(1);
    let crop_height = target_h.min(img.height()).max(1);
    let crop_x = (img.width() - crop_width) / 2;
    let crop_y = (img.height() - crop_height) / 2;
    img.crop_imm(crop_x, crop_y, crop_width, crop_height)
}

/// `fit` policy: scale down inside the bound, aspect ratio preserved.
pub fn fit_within(img: DynamicImage, bound_w: u32, bound_h: u32) -> Result<DynamicImage> {
    let (w, h) = fit_dimensions(img.width(), img.height(), bound_w, bound_h);
    if (w, h) == (img.width(), img.height()) {
        return Ok(img);
    }
    resample(img, w, h)
}

/// `crop` policy: center-crop the bound's aspect ratio out of the
/// source, then resample that window to exactly the bound.
pub fn cover_crop(img: DynamicImage, bound_w: u32, bound_h: u32) -> Result<DynamicImage> {
    let (w, h) = cover_window(img.width(), img.height(), bound_w, bound_h);
    let window = center_crop(img, w, h);
    if (window.width(), window.height()) == (bound_w, bound_h) {
        return Ok(window);
    }
    resample(window, bound_w, bound_h)
}

/// `stretch` policy: non-uniform resample to exactly the bound.
pub fn stretch_to(img: DynamicImage, bound_w: u32, bound_h: u32) -> Result<DynamicImage> {
    if (img.width(), img.height()) == (bound_w, bound_h) {
        return Ok(img);
    }
    resample(img, bound_w, bound_h)
}

/// Apply an EXIF Orientation value (1-8) so downstream geometry sees an
/// upright image. Invalid values are ignored silently.
pub fn auto_orient(img: DynamicImage, orientation: u16) -> DynamicImage {
    match orientation {
        1 => img,
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(), // transpose
        6 => img.rotate90(),
        7 => img.rotate270().fliph(), // transverse
        8 => img.rotate270(),
        _ => img,
    }
}

/// Lanczos3 resample. RGB8/RGBA8 go through fast_image_resize without
/// conversion; everything else is widened to RGBA8 first. RGBA is
/// premultiplied around the resize to avoid color bleed at transparent
/// edges. Falls back to the image crate resampler if the SIMD path
/// rejects the buffer.
pub fn resample(img: DynamicImage, dst_width: u32, dst_height: u32) -> Result<DynamicImage> {
    let src_width = img.width();
    let src_height = img.height();

    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
        return Err(BatchResizeError::resize_failed(
            (src_width, src_height),
            (dst_width, dst_height),
            "invalid dimensions for resize",
        ));
    }

    // Ownership transfer of the pixel buffer instead of copying
    let (pixel_type, mut src_pixels): (PixelType, Vec<u8>) = match img {
        DynamicImage::ImageRgb8(rgb) => (PixelType::U8x3, rgb.into_raw()),
        DynamicImage::ImageRgba8(rgba) => (PixelType::U8x4, rgba.into_raw()),
        other => (PixelType::U8x4, other.to_rgba8().into_raw()),
    };

    match fir_resize(
        src_width,
        src_height,
        &mut src_pixels,
        pixel_type,
        dst_width,
        dst_height,
    ) {
        Ok(resized) => Ok(resized),
        Err(reason) => fallback_resize(
            &src_pixels,
            src_width,
            src_height,
            pixel_type,
            dst_width,
            dst_height,
        )
        .map_err(|fallback_err| {
            BatchResizeError::resize_failed(
                (src_width, src_height),
                (dst_width, dst_height),
                format!("{reason}; image crate fallback failed: {fallback_err}"),
            )
        }),
    }
}

fn fir_resize(
    src_width: u32,
    src_height: u32,
    src_pixels: &mut [u8],
    pixel_type: PixelType,
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<DynamicImage, String> {
    let mut src_image = match fir::images::Image::from_slice_u8(
        src_width,
        src_height,
        src_pixels,
        pixel_type,
    ) {
        Ok(src_image) => src_image,
        Err(ImageBufferError::InvalidBufferAlignment) => {
            // fir needs aligned buffers; copy into one it allocates itself
            let mut aligned = fir::images::Image::new(src_width, src_height, pixel_type);
            let buffer = aligned.buffer_mut();
            if buffer.len() != src_pixels.len() {
                return Err(format!(
                    "fir alignment fallback buffer mismatch. expected {} bytes, got {} bytes",
                    src_pixels.len(),
                    buffer.len()
                ));
            }
            buffer.copy_from_slice(src_pixels);
            aligned
        }
        Err(other) => return Err(format!("fir source image error: {other:?}")),
    };

    let mut dst_image = fir::images::Image::new(dst_width, dst_height, pixel_type);

    let premultiply = pixel_type == PixelType::U8x4;
    let mul_div = MulDiv::default();
    if premultiply {
        mul_div
            .multiply_alpha_inplace(&mut src_image)
            .map_err(|e| format!("failed to premultiply alpha: {e}"))?;
    }

    let options =
        ResizeOptions::new().resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Lanczos3));
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, &options)
        .map_err(|e| format!("fir resize error: {e:?}"))?;

    if premultiply {
        mul_div
            .divide_alpha_inplace(&mut dst_image)
            .map_err(|e| format!("failed to unpremultiply alpha: {e}"))?;
    }

    let dst_pixels = dst_image.into_vec();
    match pixel_type {
        PixelType::U8x3 => RgbImage::from_raw(dst_width, dst_height, dst_pixels)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| "failed to create rgb image from resized data".to_string()),
        PixelType::U8x4 => RgbaImage::from_raw(dst_width, dst_height, dst_pixels)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(|| "failed to create rgba image from resized data".to_string()),
        _ => Err("unsupported pixel type after resize".to_string()),
    }
}

fn fallback_resize(
    src_pixels: &[u8],
    src_width: u32,
    src_height: u32,
    pixel_type: PixelType,
    dst_width: u32,
    dst_height: u32,
) -> std::result::Result<DynamicImage, String> {
    let filter = FilterType::Lanczos3;
    match pixel_type {
        PixelType::U8x3 => {
            let rgb = RgbImage::from_raw(src_width, src_height, src_pixels.to_vec())
                .ok_or_else(|| "failed to build rgb image for fallback resize".to_string())?;
            Ok(DynamicImage::ImageRgb8(image::imageops::resize(
                &rgb, dst_width, dst_height, filter,
            )))
        }
        PixelType::U8x4 => {
            let rgba = RgbaImage::from_raw(src_width, src_height, src_pixels.to_vec())
                .ok_or_else(|| "failed to build rgba image for fallback resize".to_string())?;
            Ok(DynamicImage::ImageRgba8(image::imageops::resize(
                &rgba, dst_width, dst_height, filter,
            )))
        }
        _ => Err("fallback resize supports only U8x3/U8x4 pixel types".to_string()),
    }
}
