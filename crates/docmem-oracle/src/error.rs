//! Error types for the oracle layer.

use thiserror::Error;

/// Errors that can occur when calling an extraction oracle.
#[derive(Error, Debug)]
pub enum OracleError {
    /// Transport-level failure (connection refused, timeout, body decode).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The model's reply was not the JSON object we asked for.
    #[error("invalid JSON in model reply: {0}")]
    InvalidJson(String),

    /// The model returned an empty reply.
    #[error("empty reply from model")]
    EmptyResponse,
}
