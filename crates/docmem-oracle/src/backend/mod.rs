//! Oracle backend implementations.

pub mod ollama;

use serde_json::{Map, Value};

use crate::{Result, TargetSchema};

/// Trait for AI extraction oracles.
///
/// An oracle reads the raw text of a document and returns a JSON object
/// mapping schema field names to extracted values. The output is validated
/// by shape only (it must be a JSON object); field-level interpretation is
/// the caller's concern.
#[async_trait::async_trait]
pub trait ExtractionOracle: Send + Sync {
    /// Extract the schema's fields from `raw_text`.
    ///
    /// # Arguments
    /// * `raw_text` - Full document text; backends may truncate it
    /// * `schema` - The fields to extract
    ///
    /// # Returns
    /// A JSON object keyed by field name
    async fn extract(&self, raw_text: &str, schema: &TargetSchema) -> Result<Map<String, Value>>;

    /// Short identifier for logs ("ollama", ...).
    fn name(&self) -> &'static str;
}
