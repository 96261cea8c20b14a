//! Layout signatures: stable fingerprints of a document's structure.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of leading tokens that represent a layout.
const SIGNATURE_TOKEN_COUNT: usize = 50;

/// A stable fingerprint of a document layout.
///
/// Two documents with the same signature are treated as sharing a layout
/// and therefore a rule set. The signature is a heuristic over the leading
/// tokens, not a semantic guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayoutSignature(String);

impl LayoutSignature {
    /// Compute the signature of a document's raw text.
    ///
    /// Lowercases the text, splits on whitespace, concatenates the first 50
    /// tokens with no separator, and hex-encodes the SHA-256 of the result.
    /// Deterministic: same text, same signature, on every run and host.
    /// Empty and whitespace-only inputs hash the empty string, which is a
    /// valid signature all such documents share.
    pub fn compute(raw_text: &str) -> Self {
        let head: String = raw_text
            .to_lowercase()
            .split_whitespace()
            .take(SIGNATURE_TOKEN_COUNT)
            .collect();

        let mut hasher = Sha256::new();
        hasher.update(head.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Wrap an already-computed signature string (e.g. read from storage).
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> &str {
        &self.0[..10.min(self.0.len())]
    }
}

impl std::fmt::Display for LayoutSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
