// src/batch.rs
//
// Batch orchestrator. Validates the request once, then walks the input
// sources sequentially: resolve bytes, run the engine, emit messages.
// Per-image failures become status messages; only validation failures
// abort the batch.

use crate::engine;
use crate::error::Result;
use crate::request::ResizeRequest;
use crate::source::{FetchBytes, HttpFetcher, ImageSource};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::warn;

/// Metadata record paired with each binary payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMeta {
    pub filename: String,
    pub mime_type: String,
    pub size: usize,
}

/// One element of the batch output stream.
#[derive(Clone, Debug)]
pub enum Message {
    /// Human-readable status or error text
    Status(String),
    /// Transformed image bytes plus metadata
    Blob { data: Vec<u8>, meta: BlobMeta },
}

impl Message {
    pub fn as_status(&self) -> Option<&str> {
        match self {
            Self::Status(text) => Some(text),
            Self::Blob { .. } => None,
        }
    }

    pub fn is_blob(&self) -> bool {
        matches!(self, Self::Blob { .. })
    }
}

/// A configured batch run. Construct with a validated-on-run request,
/// optionally set `host_url` for relative remote references, then call
/// `run` with the input sources.
pub struct Batch<F = HttpFetcher> {
    request: ResizeRequest,
    host_url: Option<String>,
    fetcher: F,
}

impl Batch<HttpFetcher> {
    pub fn new(request: ResizeRequest) -> Self {
        Self {
            request,
            host_url: None,
            fetcher: HttpFetcher::new(),
        }
    }
}

impl<F: FetchBytes> Batch<F> {
    /// Use a custom byte fetcher (tests plug failing or canned fetchers in).
    pub fn with_fetcher(request: ResizeRequest, fetcher: F) -> Self {
        Self {
            request,
            host_url: None,
            fetcher,
        }
    }

    /// Base URL for resolving relative remote references.
    pub fn host_url(mut self, url: impl Into<String>) -> Self {
        self.host_url = Some(url.into());
        self
    }

    /// Consume the batch and produce its message stream: a lazy,
    /// finite, single-pass iterator. Validation runs up front; a
    /// violation yields exactly one status message and an otherwise
    /// empty stream.
    pub fn run(self, sources: Vec<ImageSource>) -> Messages<F> {
        let validation = self.validate(&sources);
        let mut pending = VecDeque::new();
        let failed = if let Err(err) = validation {
            warn!(error = %err, "batch validation failed");
            pending.push_back(Message::Status(err.to_string()));
            true
        } else {
            false
        };

        Messages {
            request: self.request,
            host_url: self.host_url,
            fetcher: self.fetcher,
            sources: if failed {
                Vec::new().into_iter()
            } else {
                sources.into_iter()
            },
            pending,
        }
    }

    fn validate(&self, sources: &[ImageSource]) -> Result<()> {
        if sources.is_empty() {
            return Err(crate::error::BatchResizeError::empty_batch());
        }
        self.request.validate()
    }
}

/// Output stream of a batch run. Each call to `next` either drains a
/// queued message or processes the next input image.
pub struct Messages<F> {
    request: ResizeRequest,
    host_url: Option<String>,
    fetcher: F,
    sources: std::vec::IntoIter<ImageSource>,
    pending: VecDeque<Message>,
}

impl<F: FetchBytes> Messages<F> {
    /// Resolve one source and run the engine.
    /// Returns the summary status plus the blob message.
    fn process(&self, source: ImageSource) -> Result<(Message, Message)> {
        let bytes = source.resolve(self.host_url.as_deref(), &self.fetcher)?;
        let result = engine::resize(
            &bytes,
            self.request.method,
            self.request.quality,
            self.request.format,
        )?;

        let meta = BlobMeta {
            filename: result.filename.clone(),
            mime_type: self.request.format.mime_type().to_string(),
            size: result.byte_size,
        };

        let summary = format!(
            "Image resized to {}\n\
             Method: {}\n\
             Original size: {}x{}\n\
             New size: {}x{}\n\
             Output format: {}\n\
             Quality: {}\n\
             File size: {:.2} MB\n\
             Filename: {}",
            engine::BOUND_LABEL,
            self.request.method.description(),
            result.original_dimensions.0,
            result.original_dimensions.1,
            result.final_dimensions.0,
            result.final_dimensions.1,
            result.format,
            self.request.quality,
            result.byte_size as f64 / (1024.0 * 1024.0),
            result.filename,
        );

        Ok((
            Message::Status(summary),
            Message::Blob {
                data: result.file_bytes,
                meta,
            },
        ))
    }
}

impl<F: FetchBytes> Iterator for Messages<F> {
    type Item = Message;

    fn next(&mut self) -> Option<Message> {
        if let Some(message) = self.pending.pop_front() {
            return Some(message);
        }

        let source = self.sources.next()?;
        match self.process(source) {
            Ok((summary, blob)) => {
                self.pending.push_back(blob);
                Some(summary)
            }
            Err(err) => {
                // One explanatory message per failure; the batch continues
                warn!(error = %err, "skipping image");
                Some(Message::Status(err.to_string()))
            }
        }
    }
}
