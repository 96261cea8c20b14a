//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod process;
pub mod rules;

use std::path::Path;
use std::sync::Arc;

use docmem_core::{DocmemConfig, DocumentPipeline, OllamaOracle, SqliteRuleStore};

/// Load configuration from an explicit path, or fall back to defaults.
pub(crate) fn load_config(config_path: Option<&str>) -> anyhow::Result<DocmemConfig> {
    match config_path {
        Some(path) => Ok(DocmemConfig::from_file(Path::new(path))?),
        None => Ok(DocmemConfig::default()),
    }
}

/// Open the rule store and wire up the two-tier pipeline.
pub(crate) async fn build_pipeline(config: DocmemConfig) -> anyhow::Result<DocumentPipeline> {
    let store = SqliteRuleStore::open(&config.store.db_path).await?;
    let oracle = OllamaOracle::new(config.oracle.ollama.clone())?;
    Ok(DocumentPipeline::new(
        Arc::new(store),
        Arc::new(oracle),
        config,
    ))
}
