//! Document processing pipeline.
//!
//! Ties ingestion, layout signatures, the rule store and the AI oracle
//! together. Documents whose layout was seen before are parsed by
//! replaying stored rules; unknown layouts go to the oracle once, and the
//! oracle's answer is distilled into rules for the next document that
//! shares the layout.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use docmem_oracle::{ExtractionOracle, OracleError, TargetSchema};

use crate::error::{DocmemError, Result};
use crate::ingest;
use crate::models::config::DocmemConfig;
use crate::models::document::{
    DocField, FieldMapping, ParseMetadata, ParseMethod, ParsedDocument,
};
use crate::rules::{apply_rules, learn_rules};
use crate::signature::LayoutSignature;
use crate::store::{RuleStore, SaveOutcome};

/// Terminal status of one processed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentStatus {
    /// Parsed by replaying previously learned rules.
    #[serde(rename = "Success (Rule)")]
    SuccessRule,

    /// Parsed by the AI oracle; rules were learned for next time.
    #[serde(rename = "Success (AI & Learned)")]
    SuccessAiLearned,

    /// No text could be extracted from the file.
    #[serde(rename = "Ingestion Failed")]
    IngestionFailed,

    /// The oracle failed or returned nothing usable.
    #[serde(rename = "AI Parsing Failed")]
    AiParsingFailed,

    /// An unexpected error stopped processing of this document.
    #[serde(rename = "Fatal Error")]
    FatalError,
}

impl DocumentStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::SuccessRule => "Success (Rule)",
            DocumentStatus::SuccessAiLearned => "Success (AI & Learned)",
            DocumentStatus::IngestionFailed => "Ingestion Failed",
            DocumentStatus::AiParsingFailed => "AI Parsing Failed",
            DocumentStatus::FatalError => "Fatal Error",
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(
            self,
            DocumentStatus::SuccessRule | DocumentStatus::SuccessAiLearned
        )
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of processing a single document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    /// Name of the source file.
    pub file_name: String,

    /// Terminal status.
    pub status: DocumentStatus,

    /// Ordered human-readable account of every processing step.
    pub log: Vec<String>,

    /// Normalized output envelope, present only on success.
    pub parsed: Option<ParsedDocument>,
}

/// Counters accumulated over a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Documents parsed by replaying stored rules.
    pub rule_count: u64,

    /// Documents that needed the AI oracle.
    pub ai_count: u64,

    /// Documents that ended in a non-success status.
    pub failed_count: u64,
}

impl RunStats {
    pub fn record(&mut self, result: &DocumentResult) {
        match result.status {
            DocumentStatus::SuccessRule => self.rule_count += 1,
            DocumentStatus::SuccessAiLearned => self.ai_count += 1,
            _ => self.failed_count += 1,
        }
    }

    /// Successfully processed documents.
    pub fn processed(&self) -> u64 {
        self.rule_count + self.ai_count
    }

    pub fn total(&self) -> u64 {
        self.rule_count + self.ai_count + self.failed_count
    }
}

/// The two-tier document pipeline.
///
/// Processing never panics the batch: every failure mode collapses into a
/// terminal status on the returned [`DocumentResult`].
pub struct DocumentPipeline {
    store: Arc<dyn RuleStore>,
    oracle: Arc<dyn ExtractionOracle>,
    schema: TargetSchema,
    config: DocmemConfig,
}

impl DocumentPipeline {
    pub fn new(
        store: Arc<dyn RuleStore>,
        oracle: Arc<dyn ExtractionOracle>,
        config: DocmemConfig,
    ) -> Self {
        Self {
            store,
            oracle,
            schema: TargetSchema::new(DocField::ALL.iter().map(|f| f.as_str())),
            config,
        }
    }

    /// The extraction schema sent to the oracle.
    pub fn schema(&self) -> &TargetSchema {
        &self.schema
    }

    /// Reads and processes a document from disk.
    pub async fn process_path(&self, path: &Path) -> DocumentResult {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match tokio::fs::read(path).await {
            Ok(bytes) => self.process(&file_name, &bytes).await,
            Err(e) => Self::fatal(&file_name, &DocmemError::Io(e)),
        }
    }

    /// Processes one document from raw bytes.
    pub async fn process(&self, file_name: &str, bytes: &[u8]) -> DocumentResult {
        info!(file = %file_name, size = bytes.len(), "processing document");
        let (raw_text, log) = ingest::ingest(file_name, bytes, &self.config.ingest);

        if raw_text.is_empty() {
            return DocumentResult {
                file_name: file_name.to_string(),
                status: DocumentStatus::IngestionFailed,
                log,
                parsed: None,
            };
        }

        match self.run_pipeline(file_name, &raw_text, log).await {
            Ok(result) => result,
            Err(e) => Self::fatal(file_name, &e),
        }
    }

    /// Processes pre-extracted text, skipping ingestion.
    pub async fn process_text(&self, file_name: &str, raw_text: &str) -> DocumentResult {
        let log = vec![format!("Using pre-extracted text for '{file_name}'.")];

        if raw_text.is_empty() {
            return DocumentResult {
                file_name: file_name.to_string(),
                status: DocumentStatus::IngestionFailed,
                log,
                parsed: None,
            };
        }

        match self.run_pipeline(file_name, raw_text, log).await {
            Ok(result) => result,
            Err(e) => Self::fatal(file_name, &e),
        }
    }

    async fn run_pipeline(
        &self,
        file_name: &str,
        raw_text: &str,
        mut log: Vec<String>,
    ) -> Result<DocumentResult> {
        let signature = LayoutSignature::compute(raw_text);
        log.push(format!("Generated signature: {}...", signature.short()));

        let (method, mapping) = match self.store.find_rules(&signature).await? {
            Some(rules) => {
                info!(
                    file = %file_name,
                    signature = %signature.short(),
                    rules = rules.len(),
                    "known layout, applying saved rules"
                );
                log.push("Found signature. Applying saved rules.".to_string());
                let (mapping, rule_log) = apply_rules(&rules, raw_text);
                log.extend(rule_log);
                (ParseMethod::Rule, mapping)
            }
            None => {
                info!(
                    file = %file_name,
                    signature = %signature.short(),
                    "unknown layout, falling back to AI"
                );
                log.push("No signature found. Using AI parser.".to_string());

                let raw_map = match self.extract_with_retry(raw_text, &mut log).await {
                    Ok(map) => map,
                    Err(e) => {
                        warn!(file = %file_name, error = %e, "AI extraction gave up");
                        return Ok(DocumentResult {
                            file_name: file_name.to_string(),
                            status: DocumentStatus::AiParsingFailed,
                            log,
                            parsed: None,
                        });
                    }
                };

                if raw_map.is_empty() {
                    log.push("Error: AI returned an empty result.".to_string());
                    return Ok(DocumentResult {
                        file_name: file_name.to_string(),
                        status: DocumentStatus::AiParsingFailed,
                        log,
                        parsed: None,
                    });
                }

                let mapping = FieldMapping::from_json_object(&raw_map);
                log.push("Learning rules from AI output...".to_string());
                let rules = learn_rules(raw_text, &mapping);

                // The signature is claimed even when nothing was learnable,
                // so the save outcome is informational, never an error.
                match self.store.save(&signature, &rules).await? {
                    SaveOutcome::Inserted => {
                        log.push(format!("Saved {} new rules.", rules.len()));
                    }
                    SaveOutcome::AlreadyExists => {
                        log.push(
                            "Rules for this signature already exist. Keeping the first version."
                                .to_string(),
                        );
                    }
                }
                (ParseMethod::Ai, mapping)
            }
        };

        let status = match method {
            ParseMethod::Rule => DocumentStatus::SuccessRule,
            ParseMethod::Ai => DocumentStatus::SuccessAiLearned,
        };
        let parsed = ParsedDocument {
            metadata: ParseMetadata {
                file_name: file_name.to_string(),
                parsing_method: method,
                signature_used: signature.as_str().to_string(),
            },
            data: mapping,
        };

        Ok(DocumentResult {
            file_name: file_name.to_string(),
            status,
            log,
            parsed: Some(parsed),
        })
    }

    /// Calls the oracle, retrying transient failures with exponential
    /// backoff. The interpretation log records every attempt.
    async fn extract_with_retry(
        &self,
        raw_text: &str,
        log: &mut Vec<String>,
    ) -> docmem_oracle::Result<Map<String, Value>> {
        let max_attempts = self.config.oracle.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            if attempt == 1 {
                log.push(format!(
                    "Attempting to parse with AI ({})...",
                    self.oracle.name()
                ));
            } else {
                log.push(format!(
                    "Retrying AI parse (attempt {attempt} of {max_attempts})..."
                ));
            }

            match self.oracle.extract(raw_text, &self.schema).await {
                Ok(map) => {
                    log.push("AI model responded successfully.".to_string());
                    log.push("Successfully parsed AI response into JSON.".to_string());
                    return Ok(map);
                }
                Err(e) if attempt < max_attempts => {
                    describe_oracle_error(&e, log);
                    let delay = self
                        .config
                        .oracle
                        .retry_backoff_secs
                        .saturating_mul(2u64.saturating_pow(attempt - 1));
                    warn!(attempt, error = %e, delay_secs = delay, "oracle attempt failed");
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                }
                Err(e) => {
                    describe_oracle_error(&e, log);
                    return Err(e);
                }
            }
        }
    }

    fn fatal(file_name: &str, err: &DocmemError) -> DocumentResult {
        warn!(file = %file_name, error = %err, "document processing failed");
        DocumentResult {
            file_name: file_name.to_string(),
            status: DocumentStatus::FatalError,
            log: vec![
                "A critical error occurred during processing.".to_string(),
                format!("ERROR: {err}"),
            ],
            parsed: None,
        }
    }
}

fn describe_oracle_error(err: &OracleError, log: &mut Vec<String>) {
    match err {
        OracleError::InvalidJson(detail) => {
            log.push("Error: AI returned a non-JSON response.".to_string());
            log.push(format!("Received: {detail}"));
        }
        OracleError::EmptyResponse => {
            log.push("Error: AI returned an empty response.".to_string());
        }
        other => {
            log.push(format!(
                "An unexpected error occurred with the AI backend: {other}"
            ));
        }
    }
    debug!(error = %err, "oracle error recorded in interpretation log");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::rules::RuleSet;
    use crate::store::MemoryRuleStore;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Mutex;

    const TEXT: &str = "INVOICE #INV-2024-001\nVendor: Acme Corp\nTotal Due: $1,234.56\n";

    struct StubOracle {
        replies: Mutex<VecDeque<docmem_oracle::Result<Map<String, Value>>>>,
        calls: AtomicU32,
    }

    impl StubOracle {
        fn new(replies: Vec<docmem_oracle::Result<Map<String, Value>>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl ExtractionOracle for StubOracle {
        async fn extract(
            &self,
            _raw_text: &str,
            _schema: &TargetSchema,
        ) -> docmem_oracle::Result<Map<String, Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Err(OracleError::EmptyResponse))
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    struct SaveFailsStore;

    #[async_trait::async_trait]
    impl RuleStore for SaveFailsStore {
        async fn find_rules(
            &self,
            _signature: &LayoutSignature,
        ) -> std::result::Result<Option<RuleSet>, StoreError> {
            Ok(None)
        }

        async fn save(
            &self,
            _signature: &LayoutSignature,
            _rules: &RuleSet,
        ) -> std::result::Result<SaveOutcome, StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }
    }

    fn oracle_reply(pairs: &[(&str, &str)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    fn test_config() -> DocmemConfig {
        let mut config = DocmemConfig::default();
        config.oracle.retry_backoff_secs = 0;
        config
    }

    fn pipeline_with(
        store: Arc<MemoryRuleStore>,
        oracle: Arc<StubOracle>,
    ) -> DocumentPipeline {
        DocumentPipeline::new(store, oracle, test_config())
    }

    #[tokio::test]
    async fn test_unknown_layout_uses_oracle_and_learns() {
        let store = Arc::new(MemoryRuleStore::new());
        let oracle = StubOracle::new(vec![Ok(oracle_reply(&[
            ("invoice_id", "INV-2024-001"),
            ("vendor_name", "Acme Corp"),
        ]))]);
        let pipeline = pipeline_with(store.clone(), oracle.clone());

        let result = pipeline.process_text("inv.pdf", TEXT).await;

        assert_eq!(result.status, DocumentStatus::SuccessAiLearned);
        assert_eq!(oracle.calls(), 1);
        assert!(result.log.iter().any(|l| l.contains("No signature found")));
        assert!(result.log.contains(&"Saved 2 new rules.".to_string()));

        let parsed = result.parsed.unwrap();
        assert_eq!(parsed.metadata.parsing_method, ParseMethod::Ai);
        assert_eq!(parsed.metadata.file_name, "inv.pdf");
        assert_eq!(parsed.metadata.signature_used.len(), 64);
        assert_eq!(parsed.data.value(DocField::InvoiceId), Some("INV-2024-001"));

        let rules = store
            .find_rules(&LayoutSignature::compute(TEXT))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rules.len(), 2);
    }

    #[tokio::test]
    async fn test_known_layout_replays_rules_without_oracle() {
        let store = Arc::new(MemoryRuleStore::new());
        let oracle = StubOracle::new(vec![Ok(oracle_reply(&[
            ("invoice_id", "INV-2024-001"),
            ("vendor_name", "Acme Corp"),
        ]))]);
        let pipeline = pipeline_with(store.clone(), oracle.clone());

        let first = pipeline.process_text("a.pdf", TEXT).await;
        assert_eq!(first.status, DocumentStatus::SuccessAiLearned);

        let second = pipeline.process_text("b.pdf", TEXT).await;
        assert_eq!(second.status, DocumentStatus::SuccessRule);
        assert_eq!(oracle.calls(), 1, "rule path must not call the oracle");
        assert!(second
            .log
            .contains(&"Found signature. Applying saved rules.".to_string()));

        let parsed = second.parsed.unwrap();
        assert_eq!(parsed.metadata.parsing_method, ParseMethod::Rule);
        assert_eq!(parsed.data.value(DocField::InvoiceId), Some("INV-2024-001"));
        assert_eq!(parsed.data.value(DocField::VendorName), Some("Acme Corp"));
    }

    #[tokio::test]
    async fn test_empty_text_is_ingestion_failure() {
        let store = Arc::new(MemoryRuleStore::new());
        let oracle = StubOracle::new(vec![]);
        let pipeline = pipeline_with(store.clone(), oracle.clone());

        let result = pipeline.process_text("empty.pdf", "").await;

        assert_eq!(result.status, DocumentStatus::IngestionFailed);
        assert!(result.parsed.is_none());
        assert_eq!(oracle.calls(), 0);
        assert!(store.is_empty().await, "store must stay untouched");
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_ingestion_failure() {
        let store = Arc::new(MemoryRuleStore::new());
        let oracle = StubOracle::new(vec![]);
        let pipeline = pipeline_with(store, oracle);

        let result = pipeline.process("notes.txt", b"some plain text").await;

        assert_eq!(result.status, DocumentStatus::IngestionFailed);
        assert!(result.log.iter().any(|l| l.contains("Unsupported file type")));
    }

    #[tokio::test]
    async fn test_whitespace_only_text_proceeds_to_oracle() {
        let store = Arc::new(MemoryRuleStore::new());
        let oracle = StubOracle::new(vec![Ok(oracle_reply(&[("invoice_id", "zzz")]))]);
        let pipeline = pipeline_with(store, oracle.clone());

        let result = pipeline.process_text("blank.pdf", "   \n\t  ").await;

        // Whitespace-only text is not empty, so it gets the all-documents-
        // alike signature of the tokenless bucket.
        assert_eq!(result.status, DocumentStatus::SuccessAiLearned);
        assert_eq!(oracle.calls(), 1);
        let parsed = result.parsed.unwrap();
        assert_eq!(
            parsed.metadata.signature_used,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn test_empty_oracle_mapping_is_ai_parsing_failed() {
        let store = Arc::new(MemoryRuleStore::new());
        let oracle = StubOracle::new(vec![Ok(Map::new())]);
        let pipeline = pipeline_with(store.clone(), oracle);

        let result = pipeline.process_text("inv.pdf", TEXT).await;

        assert_eq!(result.status, DocumentStatus::AiParsingFailed);
        assert!(result.parsed.is_none());
        assert!(result
            .log
            .contains(&"Error: AI returned an empty result.".to_string()));
        assert!(store.is_empty().await, "nothing may be persisted on failure");
    }

    #[tokio::test]
    async fn test_oracle_errors_exhaust_retries_then_fail() {
        let store = Arc::new(MemoryRuleStore::new());
        let oracle = StubOracle::new(vec![
            Err(OracleError::EmptyResponse),
            Err(OracleError::EmptyResponse),
        ]);
        let pipeline = pipeline_with(store.clone(), oracle.clone());

        let result = pipeline.process_text("inv.pdf", TEXT).await;

        assert_eq!(result.status, DocumentStatus::AiParsingFailed);
        assert_eq!(oracle.calls(), 2);
        assert!(result
            .log
            .iter()
            .any(|l| l.contains("Retrying AI parse (attempt 2 of 2)")));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_oracle_error() {
        let store = Arc::new(MemoryRuleStore::new());
        let oracle = StubOracle::new(vec![
            Err(OracleError::InvalidJson("expected value at line 1".to_string())),
            Ok(oracle_reply(&[("invoice_id", "INV-2024-001")])),
        ]);
        let pipeline = pipeline_with(store, oracle.clone());

        let result = pipeline.process_text("inv.pdf", TEXT).await;

        assert_eq!(result.status, DocumentStatus::SuccessAiLearned);
        assert_eq!(oracle.calls(), 2);
        assert!(result
            .log
            .contains(&"Error: AI returned a non-JSON response.".to_string()));
    }

    #[tokio::test]
    async fn test_unlearnable_output_still_succeeds_but_claims_nothing_reusable() {
        let store = Arc::new(MemoryRuleStore::new());
        let oracle = StubOracle::new(vec![
            Ok(oracle_reply(&[("invoice_id", "NOT-IN-THE-TEXT")])),
            Ok(oracle_reply(&[("invoice_id", "NOT-IN-THE-TEXT")])),
        ]);
        let pipeline = pipeline_with(store.clone(), oracle.clone());

        let first = pipeline.process_text("a.pdf", TEXT).await;
        assert_eq!(first.status, DocumentStatus::SuccessAiLearned);
        assert!(first.log.contains(&"Saved 0 new rules.".to_string()));
        assert_eq!(store.len().await, 1, "the signature itself is claimed");

        // An empty rule set reads back as absent, so the same layout goes
        // to the oracle again.
        let second = pipeline.process_text("b.pdf", TEXT).await;
        assert_eq!(second.status, DocumentStatus::SuccessAiLearned);
        assert_eq!(oracle.calls(), 2);
        assert!(second
            .log
            .contains(&"Rules for this signature already exist. Keeping the first version.".to_string()));
    }

    #[tokio::test]
    async fn test_store_save_failure_is_fatal_for_the_document() {
        let oracle = StubOracle::new(vec![Ok(oracle_reply(&[("invoice_id", "INV-2024-001")]))]);
        let pipeline = DocumentPipeline::new(Arc::new(SaveFailsStore), oracle, test_config());

        let result = pipeline.process_text("inv.pdf", TEXT).await;

        assert_eq!(result.status, DocumentStatus::FatalError);
        assert_eq!(result.log[0], "A critical error occurred during processing.");
        assert!(result.log[1].starts_with("ERROR:"));
        assert!(result.parsed.is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_fatal_not_a_panic() {
        let store = Arc::new(MemoryRuleStore::new());
        let oracle = StubOracle::new(vec![]);
        let pipeline = pipeline_with(store, oracle);

        let result = pipeline
            .process_path(Path::new("/nonexistent/invoice.pdf"))
            .await;

        assert_eq!(result.status, DocumentStatus::FatalError);
        assert_eq!(result.file_name, "invoice.pdf");
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(DocumentStatus::SuccessRule.to_string(), "Success (Rule)");
        assert_eq!(
            DocumentStatus::SuccessAiLearned.to_string(),
            "Success (AI & Learned)"
        );
        assert_eq!(
            serde_json::to_value(DocumentStatus::AiParsingFailed).unwrap(),
            "AI Parsing Failed"
        );
        assert!(DocumentStatus::SuccessRule.is_success());
        assert!(!DocumentStatus::FatalError.is_success());
    }

    #[test]
    fn test_run_stats_recording() {
        let mut stats = RunStats::default();
        let mut result = DocumentResult {
            file_name: "a.pdf".to_string(),
            status: DocumentStatus::SuccessRule,
            log: vec![],
            parsed: None,
        };
        stats.record(&result);
        result.status = DocumentStatus::SuccessAiLearned;
        stats.record(&result);
        result.status = DocumentStatus::IngestionFailed;
        stats.record(&result);

        assert_eq!(stats.rule_count, 1);
        assert_eq!(stats.ai_count, 1);
        assert_eq!(stats.failed_count, 1);
        assert_eq!(stats.processed(), 2);
        assert_eq!(stats.total(), 3);
    }
}
