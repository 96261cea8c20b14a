//! Document data models: the fixed extraction schema and the normalized
//! output envelope.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// The fixed set of fields every document is normalized into.
///
/// Variant order is schema order; maps keyed by `DocField` iterate in it,
/// so logs and serialized output stay stable across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocField {
    /// Invoice number or identifier.
    InvoiceId,
    /// Issuing vendor's name.
    VendorName,
    /// Billed customer's name.
    CustomerName,
    /// Total amount due, as printed on the document.
    TotalAmount,
    /// Date the invoice was issued.
    InvoiceDate,
    /// Payment due date.
    DueDate,
}

impl DocField {
    /// All schema fields in schema order.
    pub const ALL: [DocField; 6] = [
        DocField::InvoiceId,
        DocField::VendorName,
        DocField::CustomerName,
        DocField::TotalAmount,
        DocField::InvoiceDate,
        DocField::DueDate,
    ];

    /// The snake_case name used in JSON output and the rule store.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocField::InvoiceId => "invoice_id",
            DocField::VendorName => "vendor_name",
            DocField::CustomerName => "customer_name",
            DocField::TotalAmount => "total_amount",
            DocField::InvoiceDate => "invoice_date",
            DocField::DueDate => "due_date",
        }
    }

    /// Parse a field from its snake_case name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "invoice_id" => Some(DocField::InvoiceId),
            "vendor_name" => Some(DocField::VendorName),
            "customer_name" => Some(DocField::CustomerName),
            "total_amount" => Some(DocField::TotalAmount),
            "invoice_date" => Some(DocField::InvoiceDate),
            "due_date" => Some(DocField::DueDate),
            _ => None,
        }
    }
}

impl fmt::Display for DocField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extracted values keyed by schema field.
///
/// `None` marks a field the extraction attempted but could not fill.
/// A field can also be absent entirely, e.g. when the rule set never had a
/// rule for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping(BTreeMap<DocField, Option<String>>);

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field's value (or explicit null).
    pub fn set(&mut self, field: DocField, value: Option<String>) {
        self.0.insert(field, value);
    }

    /// The value of a field, if present and non-null.
    pub fn value(&self, field: DocField) -> Option<&str> {
        self.0.get(&field).and_then(|v| v.as_deref())
    }

    /// Whether the field appears in the mapping at all (even as null).
    pub fn contains(&self, field: DocField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DocField, &Option<String>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Count of fields that carry an actual value.
    pub fn filled_count(&self) -> usize {
        self.0.values().filter(|v| v.is_some()).count()
    }

    /// Build a mapping from a raw oracle JSON object.
    ///
    /// Validation is by shape only: unknown keys are ignored and non-string
    /// values become null. Field contents are never inspected.
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        let mut mapping = Self::default();
        for (key, value) in object {
            let Some(field) = DocField::from_name(key) else {
                debug!("ignoring unknown field '{}' in oracle output", key);
                continue;
            };
            let value = match value {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => {
                    debug!(
                        "field '{}' has non-string value {}, treating as missing",
                        field, other
                    );
                    None
                }
            };
            mapping.set(field, value);
        }
        mapping
    }
}

/// How a document's fields were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMethod {
    /// Extracted by the AI oracle (and rules were learned from it).
    Ai,
    /// Extracted by previously learned rules.
    Rule,
}

impl ParseMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMethod::Ai => "ai",
            ParseMethod::Rule => "rule",
        }
    }
}

/// Metadata attached to every successfully parsed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseMetadata {
    /// Name of the source file.
    pub file_name: String,

    /// Which extraction path produced the data.
    pub parsing_method: ParseMethod,

    /// The layout signature the document matched (or created).
    pub signature_used: String,
}

/// The normalized output envelope: one stable JSON shape for every
/// document, regardless of which path extracted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    /// Provenance of the extraction.
    pub metadata: ParseMetadata,

    /// Extracted field values.
    pub data: FieldMapping,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_field_name_round_trip() {
        for field in DocField::ALL {
            assert_eq!(DocField::from_name(field.as_str()), Some(field));
        }
        assert_eq!(DocField::from_name("grand_total"), None);
    }

    #[test]
    fn test_mapping_keeps_schema_order() {
        let mut mapping = FieldMapping::new();
        mapping.set(DocField::DueDate, Some("2024-02-01".to_string()));
        mapping.set(DocField::InvoiceId, Some("INV-1".to_string()));

        let order: Vec<DocField> = mapping.iter().map(|(f, _)| *f).collect();
        assert_eq!(order, vec![DocField::InvoiceId, DocField::DueDate]);
    }

    #[test]
    fn test_from_json_object_shape_only() {
        let object = serde_json::json!({
            "invoice_id": "INV-42",
            "vendor_name": null,
            "total_amount": 99.5,
            "grand_total": "ignored"
        });
        let mapping = FieldMapping::from_json_object(object.as_object().unwrap());

        assert_eq!(mapping.value(DocField::InvoiceId), Some("INV-42"));
        assert!(mapping.contains(DocField::VendorName));
        assert_eq!(mapping.value(DocField::VendorName), None);
        // Non-string values survive only as nulls.
        assert!(mapping.contains(DocField::TotalAmount));
        assert_eq!(mapping.value(DocField::TotalAmount), None);
        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping.filled_count(), 1);
    }

    #[test]
    fn test_envelope_serialization() {
        let mut data = FieldMapping::new();
        data.set(DocField::InvoiceId, Some("INV-7".to_string()));
        data.set(DocField::DueDate, None);

        let parsed = ParsedDocument {
            metadata: ParseMetadata {
                file_name: "invoice.pdf".to_string(),
                parsing_method: ParseMethod::Ai,
                signature_used: "abc123".to_string(),
            },
            data,
        };

        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["metadata"]["file_name"], "invoice.pdf");
        assert_eq!(json["metadata"]["parsing_method"], "ai");
        assert_eq!(json["metadata"]["signature_used"], "abc123");
        assert_eq!(json["data"]["invoice_id"], "INV-7");
        assert_eq!(json["data"]["due_date"], Value::Null);
    }
}
