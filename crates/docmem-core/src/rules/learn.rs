//! Rule learning: turning one AI extraction into reusable rules.

use regex::RegexBuilder;
use tracing::debug;

use crate::models::document::FieldMapping;
use crate::rules::{ExtractionRule, RuleSet};

/// Learn extraction rules from one successful AI parse of `raw_text`.
///
/// For each non-null field value: trim it, escape regex metacharacters so
/// the value is matched literally, wrap it in a single capturing group, and
/// keep the rule only if it actually finds the value back in the source
/// text (same flags the applier uses). Values the candidate cannot re-find
/// are dropped silently; they are not learnable this round. The result may
/// be empty, which callers treat as "nothing learned", not a failure.
pub fn learn_rules(raw_text: &str, example: &FieldMapping) -> RuleSet {
    let mut learned = RuleSet::new();

    for (field, value) in example.iter() {
        let Some(value) = value else {
            continue;
        };

        let pattern = format!("({})", regex::escape(value.trim()));

        let matches = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
            .map(|re| re.is_match(raw_text))
            .unwrap_or(false);

        if matches {
            learned.insert(*field, ExtractionRule::regex(pattern));
        } else {
            debug!("value for '{}' not found in source text, skipping", field);
        }
    }

    learned
}
