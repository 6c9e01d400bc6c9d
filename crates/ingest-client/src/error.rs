//! Error types for the ingest client.

use thiserror::Error;

use crate::types::ErrorIndex;

/// Errors that can occur when using the ingest client.
///
/// Per-event failures inside a batch are not represented here: they are
/// returned as data through [`crate::ErrorIndex`].
#[derive(Error, Debug)]
pub enum IngestError {
    /// The request body could not be serialized. Nothing was sent.
    #[error("Failed to encode request body: {0}")]
    Encoding(#[source] serde_json::Error),

    /// The HTTP exchange could not be completed.
    #[error("Failed to send request: {0}")]
    Network(#[from] reqwest::Error),

    /// The caller's cancellation token fired before a response was read.
    #[error("Request cancelled before a response was received")]
    Cancelled,

    /// Non-success status whose body did not match the expected error shape.
    #[error("Unexpected status code: {status}")]
    UnexpectedStatus { status: u16 },

    /// A success response whose body could not be parsed.
    #[error("Failed to decode response: {0}")]
    Decoding(#[source] serde_path_to_error::Error<serde_json::Error>),

    /// The server reported why it rejected the submission.
    #[error("Server error (status {status}): {message}")]
    Server { status: u16, message: String },

    /// The server reported an error for an index that was not part of the batch.
    /// `errors` holds the failures the server reported for indices that were.
    #[error("Server reported an error for index {index}, but the batch only had {batch_len} events")]
    ErrorIndexOutOfRange {
        index: usize,
        batch_len: usize,
        errors: ErrorIndex,
    },

    /// An event was constructed with an empty table name.
    #[error("Event table name must not be empty")]
    EmptyTableName,

    /// A route template is empty or malformed.
    #[error("Invalid route: {message}")]
    InvalidRoute { message: String },

    /// Missing required configuration.
    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// The configuration could not be loaded or resolved.
    #[error("Invalid configuration: {message}")]
    Config { message: String },
}

impl IngestError {
    /// Returns `true` if the exchange did not complete, either because the
    /// transport failed or because the caller cancelled it.
    pub fn is_network(&self) -> bool {
        matches!(self, IngestError::Network(_) | IngestError::Cancelled)
    }

    /// The HTTP status code attached to this error, if the server responded.
    pub fn status(&self) -> Option<u16> {
        match self {
            IngestError::UnexpectedStatus { status } | IngestError::Server { status, .. } => {
                Some(*status)
            }
            IngestError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
