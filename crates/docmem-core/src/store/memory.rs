//! In-memory rule store for tests and short-lived embedders.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::rules::RuleSet;
use crate::signature::LayoutSignature;
use crate::store::{RuleStore, SaveOutcome};

/// Volatile store with the same contract as the SQLite one.
#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    entries: RwLock<HashMap<String, RuleSet>>,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored signatures, empty sets included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl RuleStore for MemoryRuleStore {
    async fn find_rules(&self, signature: &LayoutSignature) -> Result<Option<RuleSet>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(signature.as_str())
            .filter(|rules| !rules.is_empty())
            .cloned())
    }

    async fn save(
        &self,
        signature: &LayoutSignature,
        rules: &RuleSet,
    ) -> Result<SaveOutcome, StoreError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(signature.as_str()) {
            return Ok(SaveOutcome::AlreadyExists);
        }
        entries.insert(signature.as_str().to_string(), rules.clone());
        Ok(SaveOutcome::Inserted)
    }
}
