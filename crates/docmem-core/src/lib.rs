//! Core library for document field extraction with layout memory.
//!
//! This crate provides:
//! - Document ingestion (PDF and DOCX text extraction)
//! - Layout signatures that bucket documents by their visual header
//! - A persistent store of per-layout extraction rules
//! - Rule application and rule learning from AI oracle output
//! - The two-tier pipeline: cheap rule replay first, AI fallback once

pub mod error;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod rules;
pub mod signature;
pub mod store;

pub use error::{DocmemError, IngestError, Result, StoreError};
pub use models::config::{DocmemConfig, IngestConfig, OracleConfig, StoreConfig};
pub use models::document::{
    DocField, FieldMapping, ParseMetadata, ParseMethod, ParsedDocument,
};
pub use pipeline::{DocumentPipeline, DocumentResult, DocumentStatus, RunStats};
pub use rules::{apply_rules, learn_rules, ExtractionRule, RuleMethod, RuleSet};
pub use signature::LayoutSignature;
pub use store::{MemoryRuleStore, RuleStore, SaveOutcome, SqliteRuleStore, StoredLayout};

/// Re-export oracle types.
pub use docmem_oracle::{ExtractionOracle, OllamaConfig, OllamaOracle, OracleError, TargetSchema};
