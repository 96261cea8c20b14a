//! Persistent memory of learned rule sets, keyed by layout signature.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryRuleStore;
pub use sqlite::{SqliteRuleStore, StoredLayout};

use crate::error::StoreError;
use crate::rules::RuleSet;
use crate::signature::LayoutSignature;

/// Outcome of a [`RuleStore::save`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The signature was new; the rule set is now persisted.
    Inserted,
    /// Another writer already claimed this signature; nothing was written.
    AlreadyExists,
}

/// Trait for rule-set persistence.
///
/// Semantics shared by every implementation:
/// - `find_rules` is an exact-signature lookup; a stored set with zero
///   rules reads back as absent.
/// - `save` inserts when the signature is unknown and is a no-op
///   otherwise. First writer wins; sets are never merged, replaced, or
///   deleted.
#[async_trait::async_trait]
pub trait RuleStore: Send + Sync {
    /// Look up the rule set learned for a signature.
    async fn find_rules(&self, signature: &LayoutSignature) -> Result<Option<RuleSet>, StoreError>;

    /// Persist a newly learned rule set for a signature.
    async fn save(
        &self,
        signature: &LayoutSignature,
        rules: &RuleSet,
    ) -> Result<SaveOutcome, StoreError>;
}
