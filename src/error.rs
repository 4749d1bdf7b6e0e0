// src/error.rs
//
// Unified error handling for batch-resize.
// Uses thiserror for simple, type-safe error handling.
//
// Error stages:
// - Validation: malformed batch-level parameters, aborts the whole batch
// - Source: an individual image's declared type is not accepted, skips it
// - Fetch: network/transport failure retrieving a remote image, skips it
// - Transform: decode/resize/encode failure inside the engine, skips it

use std::borrow::Cow;
use thiserror::Error;

/// Stage at which an error occurred.
///
/// The orchestrator uses this to decide between aborting the batch
/// (Validation) and skipping the current image (everything else).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStage {
    /// Malformed batch-level parameters
    Validation,
    /// Declared media type not accepted
    Source,
    /// Network/transport failure retrieving a remote image
    Fetch,
    /// Decode, resize, or encode failure inside the engine
    Transform,
}

/// batch-resize error types
///
/// All errors are type-safe and carry the original cause text.
/// No numeric error codes - just clear error variants.
#[derive(Debug, Error)]
pub enum BatchResizeError {
    // Validation Errors
    #[error("No input images provided")]
    EmptyBatch,

    #[error("Invalid value for {name}: {value}. {reason}")]
    InvalidArgument {
        name: Cow<'static, str>,
        value: Cow<'static, str>,
        reason: Cow<'static, str>,
    },

    #[error("Unsupported resize method: '{method}'. Expected fit, crop, or stretch")]
    UnsupportedMethod { method: Cow<'static, str> },

    #[error("Unsupported output format: '{format}'. Expected jpeg, png, or webp")]
    UnsupportedOutputFormat { format: Cow<'static, str> },

    // Source Errors
    #[error("Unsupported media type: {media_type}")]
    UnsupportedMediaType { media_type: Cow<'static, str> },

    // Fetch Errors
    #[error("Relative image location '{url}' requires a host_url")]
    MissingHostUrl { url: Cow<'static, str> },

    #[error("Failed to download image from '{url}': {message}")]
    FetchFailed {
        url: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    // Transform Errors
    #[error("Failed to decode image: {message}")]
    DecodeFailed { message: Cow<'static, str> },

    #[error("Image dimension {dimension} exceeds maximum {max}")]
    DimensionExceedsLimit { dimension: u32, max: u32 },

    #[error("Image pixel count {pixels} exceeds maximum {max}")]
    PixelCountExceedsLimit { pixels: u64, max: u64 },

    #[error("Resize failed ({source_width}x{source_height} -> {target_width}x{target_height}): {message}")]
    ResizeFailed {
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
        message: Cow<'static, str>,
    },

    #[error("Failed to encode as {format}: {message}")]
    EncodeFailed {
        format: Cow<'static, str>,
        message: Cow<'static, str>,
    },
}

// Constructor Helpers
impl BatchResizeError {
    pub fn empty_batch() -> Self {
        Self::EmptyBatch
    }

    pub fn invalid_argument(
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported_method(method: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedMethod {
            method: method.into(),
        }
    }

    pub fn unsupported_output_format(format: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedOutputFormat {
            format: format.into(),
        }
    }

    pub fn unsupported_media_type(media_type: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedMediaType {
            media_type: media_type.into(),
        }
    }

    pub fn missing_host_url(url: impl Into<Cow<'static, str>>) -> Self {
        Self::MissingHostUrl { url: url.into() }
    }

    pub fn fetch_failed(
        url: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::FetchFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn decode_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn dimension_exceeds_limit(dimension: u32, max: u32) -> Self {
        Self::DimensionExceedsLimit { dimension, max }
    }

    pub fn pixel_count_exceeds_limit(pixels: u64, max: u64) -> Self {
        Self::PixelCountExceedsLimit { pixels, max }
    }

    pub fn resize_failed(
        source_dims: (u32, u32),
        target_dims: (u32, u32),
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::ResizeFailed {
            source_width: source_dims.0,
            source_height: source_dims.1,
            target_width: target_dims.0,
            target_height: target_dims.1,
            message: message.into(),
        }
    }

    pub fn encode_failed(
        format: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Get the stage at which this error occurred
    pub fn stage(&self) -> ErrorStage {
        match self {
            Self::EmptyBatch
            | Self::InvalidArgument { .. }
            | Self::UnsupportedMethod { .. }
            | Self::UnsupportedOutputFormat { .. } => ErrorStage::Validation,

            Self::UnsupportedMediaType { .. } => ErrorStage::Source,

            Self::MissingHostUrl { .. } | Self::FetchFailed { .. } => ErrorStage::Fetch,

            Self::DecodeFailed { .. }
            | Self::DimensionExceedsLimit { .. }
            | Self::PixelCountExceedsLimit { .. }
            | Self::ResizeFailed { .. }
            | Self::EncodeFailed { .. } => ErrorStage::Transform,
        }
    }

    /// Whether this error terminates the whole batch.
    ///
    /// Only validation errors abort; every per-image failure is
    /// converted into a status message and the loop continues.
    pub fn aborts_batch(&self) -> bool {
        self.stage() == ErrorStage::Validation
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, BatchResizeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BatchResizeError::fetch_failed("https://host/a.png", "timed out");
        assert!(err.to_string().contains("https://host/a.png"));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_validation_errors_abort_batch() {
        assert!(BatchResizeError::empty_batch().aborts_batch());
        assert!(
            BatchResizeError::invalid_argument("quality", "101", "must be between 1 and 100")
                .aborts_batch()
        );
        assert!(BatchResizeError::unsupported_method("squash").aborts_batch());
        assert!(BatchResizeError::unsupported_output_format("tiff").aborts_batch());
    }

    #[test]
    fn test_per_image_errors_skip_only() {
        assert!(!BatchResizeError::unsupported_media_type("text/plain").aborts_batch());
        assert!(!BatchResizeError::fetch_failed("u", "m").aborts_batch());
        assert!(!BatchResizeError::decode_failed("bad header").aborts_batch());
        assert!(!BatchResizeError::encode_failed("jpeg", "m").aborts_batch());
        assert!(!BatchResizeError::resize_failed((1, 1), (2, 2), "m").aborts_batch());
    }

    #[test]
    fn test_error_stages() {
        assert_eq!(
            BatchResizeError::unsupported_media_type("text/plain").stage(),
            ErrorStage::Source
        );
        assert_eq!(
            BatchResizeError::missing_host_url("/files/a.png").stage(),
            ErrorStage::Fetch
        );
        assert_eq!(
            BatchResizeError::dimension_exceeds_limit(40000, 32768).stage(),
            ErrorStage::Transform
        );
        assert_eq!(
            BatchResizeError::pixel_count_exceeds_limit(200_000_000, 100_000_000).stage(),
            ErrorStage::Transform
        );
    }
}
