//! AI extraction oracle abstraction for docmem.
//!
//! The oracle is the expensive path of the extraction pipeline: given raw
//! document text and a target schema, it returns a JSON object with the
//! schema's fields filled in. Backends:
//! - `ollama` against a local Ollama server (`/api/chat` with JSON mode)

mod backend;
mod error;
mod schema;

pub use backend::ExtractionOracle;
pub use backend::ollama::{OllamaConfig, OllamaOracle};
pub use error::OracleError;
pub use schema::TargetSchema;

/// Result type for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;
