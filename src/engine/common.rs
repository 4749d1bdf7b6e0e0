// src/engine/common.rs
//
// Panic isolation for codec calls. libjpeg fatal errors surface as
// Rust panics through the mozjpeg bindings; without a guard a single
// pathological image would unwind through resize() and kill the whole
// batch instead of skipping one image.

use crate::error::{BatchResizeError, Result};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

/// Run a codec closure with panics converted into stage errors.
///
/// `stage` is `"decode:<codec>"` or `"encode:<format>"`; it selects
/// whether a caught panic maps to `DecodeFailed` or `EncodeFailed`.
pub(crate) fn run_with_panic_policy<T>(
    stage: &'static str,
    f: impl FnOnce() -> Result<T>,
) -> Result<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(stage, message = %message, "codec panicked");
            Err(match stage.strip_prefix("encode:") {
                Some(format) => BatchResizeError::encode_failed(
                    format.to_string(),
                    format!("codec panicked: {message}"),
                ),
                None => {
                    BatchResizeError::decode_failed(format!("{stage}: codec panicked: {message}"))
                }
            })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
