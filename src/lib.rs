// lib.rs
//
// batch-resize: bounded 1080p-class image resizing with a message-stream API
//
// Design goals:
// - One validated configuration per batch, no dynamic parameter bags
// - Pure resize engine: bytes in, bytes + metadata out
// - Per-image failures skip, never abort
// - Lazy single-pass message stream, decoupled from any host protocol

pub mod batch;
pub mod engine;
pub mod error;
pub mod request;
pub mod source;

pub use batch::{Batch, BlobMeta, Message, Messages};
pub use engine::{resize, ResizeResult, BOUND_LABEL, TARGET_HEIGHT, TARGET_WIDTH};
pub use error::{BatchResizeError, ErrorStage, Result};
pub use request::{OutputFormat, ResizeMethod, ResizeRequest};
pub use source::{FetchBytes, HttpFetcher, ImageSource, ACCEPTED_MEDIA_TYPES};
