// tests/engine_tests.rs
//
// End-to-end engine coverage through the public API: policy contracts,
// color-mode normalization, filename generation, decode failures.

use batch_resize::{resize, OutputFormat, ResizeMethod, TARGET_HEIGHT, TARGET_WIDTH};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage, RgbImage};
use std::io::Cursor;

fn rgb_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

fn rgba_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 128, ((x + y) % 256) as u8])
    }))
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

#[test]
fn fit_scales_down_preserving_aspect_ratio() {
    let bytes = encode(&rgb_image(4000, 3000), ImageFormat::Png);
    let result = resize(&bytes, ResizeMethod::Fit, 90, OutputFormat::Jpeg).unwrap();
    let (w, h) = result.final_dimensions;
    assert!(w <= TARGET_WIDTH && h <= TARGET_HEIGHT);
    let original_ratio = 4000.0 / 3000.0;
    let final_ratio = w as f64 / h as f64;
    assert!((original_ratio - final_ratio).abs() < 0.01);
    assert_eq!(result.original_dimensions, (4000, 3000));
}

#[test]
fn fit_passes_small_images_through() {
    let bytes = encode(&rgb_image(320, 240), ImageFormat::Png);
    let result = resize(&bytes, ResizeMethod::Fit, 90, OutputFormat::Png).unwrap();
    assert_eq!(result.final_dimensions, (320, 240));
}

#[test]
fn crop_always_fills_the_bound() {
    for (w, h) in [(4000, 1000), (800, 3000), (100, 100)] {
        let bytes = encode(&rgb_image(w, h), ImageFormat::Png);
        let result = resize(&bytes, ResizeMethod::Crop, 85, OutputFormat::Jpeg).unwrap();
        assert_eq!(
            result.final_dimensions,
            (TARGET_WIDTH, TARGET_HEIGHT),
            "source {w}x{h}"
        );
    }
}

#[test]
fn crop_handles_extreme_aspect_ratios() {
    // Skinny sources must not inflate intermediate buffers on the way
    // to the bound
    for (w, h) in [(1200, 1), (1, 1200)] {
        let bytes = encode(&rgb_image(w, h), ImageFormat::Png);
        let result = resize(&bytes, ResizeMethod::Crop, 85, OutputFormat::Png).unwrap();
        assert_eq!(
            result.final_dimensions,
            (TARGET_WIDTH, TARGET_HEIGHT),
            "source {w}x{h}"
        );
    }
}

#[test]
fn stretch_always_fills_the_bound() {
    let bytes = encode(&rgb_image(50, 900), ImageFormat::Png);
    let result = resize(&bytes, ResizeMethod::Stretch, 85, OutputFormat::Webp).unwrap();
    assert_eq!(result.final_dimensions, (TARGET_WIDTH, TARGET_HEIGHT));
}

#[test]
fn format_token_matches_request() {
    let bytes = encode(&rgb_image(64, 64), ImageFormat::Png);
    for (format, token) in [
        (OutputFormat::Jpeg, "JPEG"),
        (OutputFormat::Png, "PNG"),
        (OutputFormat::Webp, "WEBP"),
    ] {
        let result = resize(&bytes, ResizeMethod::Fit, 90, format).unwrap();
        assert_eq!(result.format, token);
        assert_eq!(result.byte_size, result.file_bytes.len());
    }
}

#[test]
fn png_round_trip_recovers_alpha_raster() {
    let bytes = encode(&rgba_image(1600, 1200), ImageFormat::Png);
    let result = resize(&bytes, ResizeMethod::Fit, 90, OutputFormat::Png).unwrap();
    let decoded = image::load_from_memory(&result.file_bytes).unwrap();
    assert!(decoded.color().has_alpha());
    assert_eq!(decoded.color().channel_count(), 4);
    assert_eq!(
        (decoded.width(), decoded.height()),
        result.final_dimensions
    );
}

#[test]
fn webp_output_preserves_alpha() {
    let bytes = encode(&rgba_image(400, 300), ImageFormat::Png);
    let result = resize(&bytes, ResizeMethod::Fit, 90, OutputFormat::Webp).unwrap();
    let decoded = image::load_from_memory(&result.file_bytes).unwrap();
    assert!(decoded.color().has_alpha());
}

#[test]
fn jpeg_output_drops_alpha() {
    let bytes = encode(&rgba_image(400, 300), ImageFormat::Png);
    let result = resize(&bytes, ResizeMethod::Fit, 90, OutputFormat::Jpeg).unwrap();
    let decoded = image::load_from_memory(&result.file_bytes).unwrap();
    assert!(!decoded.color().has_alpha());
}

#[test]
fn bmp_and_gif_inputs_are_decodable() {
    let bmp = encode(&rgb_image(120, 80), ImageFormat::Bmp);
    let result = resize(&bmp, ResizeMethod::Fit, 90, OutputFormat::Jpeg).unwrap();
    assert_eq!(result.final_dimensions, (120, 80));

    let gif = encode(&rgb_image(60, 40), ImageFormat::Gif);
    let result = resize(&gif, ResizeMethod::Fit, 90, OutputFormat::Png).unwrap();
    assert_eq!(result.final_dimensions, (60, 40));
}

/// Splice an APP1 Exif segment carrying only the Orientation tag into
/// a JPEG, right after the SOI marker.
fn with_orientation(jpeg: &[u8], orientation: u16) -> Vec<u8> {
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II*\0");
    tiff.extend_from_slice(&8u32.to_le_bytes()); // IFD0 offset
    tiff.extend_from_slice(&1u16.to_le_bytes()); // one entry
    tiff.extend_from_slice(&0x0112u16.to_le_bytes()); // Orientation
    tiff.extend_from_slice(&3u16.to_le_bytes()); // SHORT
    tiff.extend_from_slice(&1u32.to_le_bytes()); // count
    tiff.extend_from_slice(&(orientation as u32).to_le_bytes());
    tiff.extend_from_slice(&0u32.to_le_bytes()); // no next IFD

    let mut app1 = Vec::new();
    app1.extend_from_slice(b"Exif\0\0");
    app1.extend_from_slice(&tiff);

    let mut out = Vec::with_capacity(jpeg.len() + app1.len() + 4);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((app1.len() as u16 + 2).to_be_bytes()));
    out.extend_from_slice(&app1);
    out.extend_from_slice(&jpeg[2..]);
    out
}

#[test]
fn exif_orientation_six_uprights_dimensions_before_geometry() {
    // Orientation 6 is a 90° rotation: a 40x20 raster displays as 20x40
    let jpeg = encode(&rgb_image(40, 20), ImageFormat::Jpeg);
    let tagged = with_orientation(&jpeg, 6);
    let result = resize(&tagged, ResizeMethod::Fit, 90, OutputFormat::Png).unwrap();
    assert_eq!(result.original_dimensions, (20, 40));
    assert_eq!(result.final_dimensions, (20, 40));

    // The untagged source keeps its stored orientation
    let plain = resize(&jpeg, ResizeMethod::Fit, 90, OutputFormat::Png).unwrap();
    assert_eq!(plain.original_dimensions, (40, 20));
}

#[test]
fn exif_orientation_applies_before_crop_policy() {
    // A 2:1 landscape tagged sideways becomes 1:2 portrait; crop must
    // still land exactly on the bound
    let jpeg = encode(&rgb_image(600, 300), ImageFormat::Jpeg);
    let tagged = with_orientation(&jpeg, 6);
    let result = resize(&tagged, ResizeMethod::Crop, 85, OutputFormat::Jpeg).unwrap();
    assert_eq!(result.original_dimensions, (300, 600));
    assert_eq!(result.final_dimensions, (TARGET_WIDTH, TARGET_HEIGHT));
}

#[test]
fn filename_shape_is_stable() {
    let bytes = encode(&rgb_image(32, 32), ImageFormat::Png);
    let result = resize(&bytes, ResizeMethod::Crop, 90, OutputFormat::Webp).unwrap();
    let name = &result.filename;
    // 1080p_crop_YYYYMMDD_HHMMSS_xxxxxxxx.webp
    let parts: Vec<&str> = name.split('_').collect();
    assert_eq!(parts.len(), 5, "{name}");
    assert_eq!(parts[0], "1080p");
    assert_eq!(parts[1], "crop");
    assert_eq!(parts[2].len(), 8);
    assert_eq!(parts[3].len(), 6);
    let (suffix, ext) = parts[4].split_once('.').unwrap();
    assert_eq!(suffix.len(), 8);
    assert_eq!(ext, "webp");
}

#[test]
fn repeated_calls_yield_distinct_filenames() {
    let bytes = encode(&rgb_image(16, 16), ImageFormat::Png);
    let a = resize(&bytes, ResizeMethod::Fit, 90, OutputFormat::Jpeg).unwrap();
    let b = resize(&bytes, ResizeMethod::Fit, 90, OutputFormat::Jpeg).unwrap();
    assert_ne!(a.filename, b.filename);
}

#[test]
fn truncated_png_fails_with_decode_error() {
    let mut bytes = encode(&rgb_image(64, 64), ImageFormat::Png);
    bytes.truncate(bytes.len() / 2);
    let err = resize(&bytes, ResizeMethod::Fit, 90, OutputFormat::Jpeg).unwrap_err();
    assert!(err.to_string().to_lowercase().contains("decode"));
}
