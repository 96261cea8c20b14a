//! Target schema handed to the oracle.

use serde_json::{Map, Value};

/// The set of fields the oracle is asked to extract.
///
/// Carries field names only. The oracle is expected to return a JSON object
/// keyed by these names with string (or null) values, but that shape is
/// enforced by the caller, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSchema {
    fields: Vec<String>,
}

impl TargetSchema {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Field names in schema order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// An all-null JSON object showing the oracle the expected output shape.
    pub fn json_template(&self) -> String {
        let mut template = Map::new();
        for field in &self.fields {
            template.insert(field.clone(), Value::Null);
        }
        serde_json::to_string_pretty(&Value::Object(template)).unwrap_or_else(|_| "{}".to_string())
    }
}
