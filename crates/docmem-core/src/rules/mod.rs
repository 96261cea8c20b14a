//! Learned extraction rules: the data model plus apply and learn passes.

pub mod apply;
pub mod learn;

pub use apply::apply_rules;
pub use learn::learn_rules;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::document::DocField;

/// How a rule extracts its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleMethod {
    /// Regex search over the raw text.
    Regex,
}

/// A single learned extraction rule for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRule {
    /// The pattern to search for.
    pub pattern: String,

    /// Extraction method; only regex today.
    pub method: RuleMethod,
}

impl ExtractionRule {
    /// A regex rule with the given pattern.
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            method: RuleMethod::Regex,
        }
    }
}

/// The set of rules learned for one layout, keyed by schema field.
///
/// A rule set is created exactly once per novel signature and never mutated
/// afterwards. Fields that could not be learned are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet(BTreeMap<DocField, ExtractionRule>);

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: DocField, rule: ExtractionRule) {
        self.0.insert(field, rule);
    }

    pub fn get(&self, field: DocField) -> Option<&ExtractionRule> {
        self.0.get(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DocField, &ExtractionRule)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rule_serialization_shape() {
        let rule = ExtractionRule::regex(r"(INV\-\d+)");
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["pattern"], r"(INV\-\d+)");
        assert_eq!(json["method"], "regex");
    }

    #[test]
    fn test_rule_set_orders_by_schema() {
        let mut set = RuleSet::new();
        set.insert(DocField::DueDate, ExtractionRule::regex("d"));
        set.insert(DocField::InvoiceId, ExtractionRule::regex("i"));
        set.insert(DocField::TotalAmount, ExtractionRule::regex("t"));

        let order: Vec<DocField> = set.iter().map(|(f, _)| *f).collect();
        assert_eq!(
            order,
            vec![DocField::InvoiceId, DocField::TotalAmount, DocField::DueDate]
        );
    }
}
