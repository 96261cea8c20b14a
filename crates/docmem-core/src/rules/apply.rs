//! Deterministic rule application: the cheap extraction path.

use regex::RegexBuilder;
use tracing::debug;

use crate::models::document::FieldMapping;
use crate::rules::RuleSet;

/// Apply a learned rule set to raw text.
///
/// Every rule in the set produces an entry in the mapping: the trimmed
/// match on success, null when the pattern finds nothing or fails to
/// compile. A bad rule never aborts the document; the failure is recorded
/// in the returned log and the remaining fields still run. Patterns compile
/// case-insensitive with `.` matching newlines, and a capturing group takes
/// precedence over the whole match.
pub fn apply_rules(rules: &RuleSet, raw_text: &str) -> (FieldMapping, Vec<String>) {
    let mut extracted = FieldMapping::new();
    let mut log = vec!["Applying saved rules to extract data.".to_string()];

    for (field, rule) in rules.iter() {
        let regex = RegexBuilder::new(&rule.pattern)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build();

        let regex = match regex {
            Ok(regex) => regex,
            Err(e) => {
                debug!("rule for '{}' failed to compile: {}", field, e);
                log.push(format!("  - ERROR: Rule for '{field}' failed with error: {e}"));
                extracted.set(*field, None);
                continue;
            }
        };

        match regex.captures(raw_text) {
            Some(caps) => {
                // Prefer the first capturing group when the pattern has one.
                let matched = if regex.captures_len() > 1 {
                    caps.get(1)
                } else {
                    caps.get(0)
                };
                match matched {
                    Some(m) => {
                        let preview: String = m.as_str().chars().take(30).collect();
                        log.push(format!(
                            "  - SUCCESS: Found '{field}' with value '{}...'",
                            preview.trim()
                        ));
                        extracted.set(*field, Some(m.as_str().trim().to_string()));
                    }
                    None => {
                        log.push(format!("  - FAILED: Could not find '{field}' using pattern."));
                        extracted.set(*field, None);
                    }
                }
            }
            None => {
                log.push(format!("  - FAILED: Could not find '{field}' using pattern."));
                extracted.set(*field, None);
            }
        }
    }

    (extracted, log)
}
