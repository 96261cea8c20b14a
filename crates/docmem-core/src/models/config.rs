//! Configuration structures for the extraction pipeline.

use std::path::PathBuf;

use docmem_oracle::OllamaConfig;
use serde::{Deserialize, Serialize};

/// Main configuration for the docmem pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocmemConfig {
    /// Document ingestion configuration.
    pub ingest: IngestConfig,

    /// AI oracle configuration.
    pub oracle: OracleConfig,

    /// Rule store configuration.
    pub store: StoreConfig,
}

impl Default for DocmemConfig {
    fn default() -> Self {
        Self {
            ingest: IngestConfig::default(),
            oracle: OracleConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Document ingestion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Minimum extracted text length before a PDF is flagged as likely
    /// scanned. OCR is an external concern; short text is kept as-is.
    pub min_text_length: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            min_text_length: 100,
        }
    }
}

/// AI oracle configuration: retry policy plus the backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Total attempts per document before giving up on the oracle.
    pub max_attempts: u32,

    /// Base backoff between attempts in seconds (doubles per retry).
    pub retry_backoff_secs: u64,

    /// Ollama backend settings.
    pub ollama: OllamaConfig,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry_backoff_secs: 1,
            ollama: OllamaConfig::default(),
        }
    }
}

/// Rule store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database holding learned rules.
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/docmem.db"),
        }
    }
}

impl DocmemConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DocmemConfig::default();
        assert_eq!(config.ingest.min_text_length, 100);
        assert_eq!(config.oracle.max_attempts, 2);
        assert_eq!(config.oracle.ollama.model, "phi3:mini");
        assert_eq!(config.store.db_path, PathBuf::from("data/docmem.db"));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{"oracle": {"max_attempts": 5}}"#;
        let config: DocmemConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.oracle.max_attempts, 5);
        assert_eq!(config.oracle.retry_backoff_secs, 1);
        assert_eq!(config.ingest.min_text_length, 100);
    }
}
