//! Error types for the unclutter library.

use thiserror::Error;

/// Result type alias for extraction operations
pub type Result<T> = std::result::Result<T, ReaderError>;

/// Errors that can occur while parsing a document.
///
/// Heuristic failures (malformed JSON-LD, unresolvable URIs, unknown tags)
/// never surface here: the pipeline recovers from them locally and keeps
/// going. Only structural problems escape to the caller.
#[derive(Error, Debug)]
pub enum ReaderError {
    /// Invalid base URL provided
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Document structure is invalid or missing required elements
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Element count exceeds the configured `max_elems_to_parse`
    #[error("Maximum element limit exceeded: {0}")]
    MaxElementsExceeded(usize),
}
