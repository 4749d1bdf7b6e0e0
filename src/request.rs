// src/request.rs
//
// Batch-level configuration: resize policy, quality, output format.
// Parsed and validated once per batch, before any per-image work.

use crate::error::{BatchResizeError, Result};
use serde::{Deserialize, Serialize};

/// Scaling policy applied against the fixed target bound.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMethod {
    /// Uniform scale-down inside the bound, aspect ratio preserved, never upscales
    #[default]
    Fit,
    /// Scale to cover the bound, then center-crop to exactly the bound
    Crop,
    /// Non-uniform scale to exactly the bound, aspect ratio ignored
    Stretch,
}

impl ResizeMethod {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "fit" => Ok(Self::Fit),
            "crop" => Ok(Self::Crop),
            "stretch" => Ok(Self::Stretch),
            other => Err(BatchResizeError::unsupported_method(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fit => "fit",
            Self::Crop => "crop",
            Self::Stretch => "stretch",
        }
    }

    /// Human-readable description used in status messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Fit => "fit (preserves aspect ratio)",
            Self::Crop => "crop (exact dimensions)",
            Self::Stretch => "stretch (may distort)",
        }
    }
}

/// Output encoding for the transformed image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::Webp),
            other => Err(BatchResizeError::unsupported_output_format(
                other.to_string(),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    /// Upper-cased format token reported in results.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Webp => "WEBP",
        }
    }

    /// Filename extension.
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }
}

/// Validated batch configuration.
///
/// Deserializes from a host parameter payload with per-field defaults,
/// so `{}` yields the default request. Quality is range-checked by
/// `validate()` rather than the type, matching the 1-100 contract.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ResizeRequest {
    #[serde(default)]
    pub method: ResizeMethod,
    #[serde(default = "default_quality")]
    pub quality: u8,
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_quality() -> u8 {
    90
}

impl Default for ResizeRequest {
    fn default() -> Self {
        Self {
            method: ResizeMethod::Fit,
            quality: default_quality(),
            format: OutputFormat::Jpeg,
        }
    }
}

impl ResizeRequest {
    pub fn new(method: ResizeMethod, quality: u8, format: OutputFormat) -> Self {
        Self {
            method,
            quality,
            format,
        }
    }

    /// Fail-fast range check, run once per batch.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.quality) {
            return Err(BatchResizeError::invalid_argument(
                "quality",
                self.quality.to_string(),
                "must be between 1 and 100",
            ));
        }
        Ok(())
    }
}
