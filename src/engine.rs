// src/engine.rs
//
// The resize engine. Pure transformation: bytes in, transformed bytes
// plus metadata out. No I/O, no host dependency.
//
// This file is a facade over the decomposed modules in engine/

use crate::error::Result;
use crate::request::{OutputFormat, ResizeMethod};
use chrono::Local;
use tracing::{debug, info};
use uuid::Uuid;

// =============================================================================
// LIMITS AND TARGET BOUND
// =============================================================================

/// Fixed target bound: width of the 1080p-class box.
pub const TARGET_WIDTH: u32 = 1080;

/// Fixed target bound: height of the 1080p-class box.
pub const TARGET_HEIGHT: u32 = 720;

/// Label used as the filename prefix for the fixed bound.
pub const BOUND_LABEL: &str = "1080p";

/// Maximum allowed image dimension (width or height).
/// Images larger than 32768x32768 are rejected to prevent decompression bombs.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height).
/// 100 megapixels = 400MB uncompressed RGBA. Beyond this is likely malicious.
pub const MAX_PIXELS: u64 = 100_000_000;

mod common;
mod decoder;
mod encoder;
mod pipeline;

pub use decoder::{check_dimensions, decode_image, detect_exif_orientation};
pub use encoder::{encode, encode_jpeg, encode_png, encode_webp};
pub use pipeline::{auto_orient, center_crop, cover_window, fit_dimensions, resample};

/// Output of one engine invocation. Ownership transfers to the caller;
/// no state is shared between invocations.
#[derive(Clone, Debug)]
pub struct ResizeResult {
    pub file_bytes: Vec<u8>,
    /// Upper-cased output format token (JPEG, PNG, WEBP)
    pub format: String,
    /// Always equal to `file_bytes.len()`
    pub byte_size: usize,
    pub filename: String,
    pub final_dimensions: (u32, u32),
    pub original_dimensions: (u32, u32),
    pub method: String,
}

/// Resize `image_bytes` against the fixed 1080x720 bound and re-encode.
///
/// Decodes, applies EXIF orientation, applies the scaling policy,
/// normalizes color mode for the target format, and encodes. Any
/// decode/transform/encode failure is surfaced with its original cause
/// text; no partial result is returned.
pub fn resize(
    image_bytes: &[u8],
    method: ResizeMethod,
    quality: u8,
    format: OutputFormat,
) -> Result<ResizeResult> {
    decoder::ensure_dimensions_safe(image_bytes)?;
    let decoded = decoder::decode_image(image_bytes)?;

    // Orientation must be applied before any geometry so the policy
    // sees upright dimensions.
    let upright = match decoder::detect_exif_orientation(image_bytes) {
        Some(orientation) => pipeline::auto_orient(decoded, orientation),
        None => decoded,
    };

    let original_dimensions = (upright.width(), upright.height());
    debug!(
        width = original_dimensions.0,
        height = original_dimensions.1,
        method = method.as_str(),
        "decoded image"
    );

    let resized = match method {
        ResizeMethod::Fit => pipeline::fit_within(upright, TARGET_WIDTH, TARGET_HEIGHT)?,
        ResizeMethod::Crop => pipeline::cover_crop(upright, TARGET_WIDTH, TARGET_HEIGHT)?,
        ResizeMethod::Stretch => pipeline::stretch_to(upright, TARGET_WIDTH, TARGET_HEIGHT)?,
    };
    let final_dimensions = (resized.width(), resized.height());

    let file_bytes = encoder::encode(&resized, format, quality)?;
    let byte_size = file_bytes.len();
    let filename = generate_filename(method, format);

    info!(
        from_width = original_dimensions.0,
        from_height = original_dimensions.1,
        to_width = final_dimensions.0,
        to_height = final_dimensions.1,
        bytes = byte_size,
        filename = %filename,
        "image resized"
    );

    Ok(ResizeResult {
        file_bytes,
        format: format.token().to_string(),
        byte_size,
        filename,
        final_dimensions,
        original_dimensions,
        method: method.as_str().to_string(),
    })
}

/// Deterministic filename: bound label, method, second-resolution
/// timestamp, and an 8-character random suffix. The suffix guarantees
/// practical uniqueness within a batch without a coordination service.
fn generate_filename(method: ResizeMethod, format: OutputFormat) -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let unique = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}_{}.{}",
        BOUND_LABEL,
        method.as_str(),
        timestamp,
        &unique[..8],
        format.extension()
    )
}
