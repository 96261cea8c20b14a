//! SQLite-backed rule store.
//!
//! Two tables: `layouts` maps a layout signature to a row id, `rules`
//! holds one row per learned field rule. The signature column carries a
//! UNIQUE constraint, so concurrent learners race on `INSERT OR IGNORE`
//! and the first writer wins.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use rusqlite::{params, Connection};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::document::DocField;
use crate::rules::{ExtractionRule, RuleSet};
use crate::signature::LayoutSignature;
use crate::store::{RuleStore, SaveOutcome};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS layouts (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    signature   TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rules (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    layout_id   INTEGER NOT NULL,
    field_name  TEXT NOT NULL,
    rule_json   TEXT NOT NULL,
    FOREIGN KEY (layout_id) REFERENCES layouts (id)
);

CREATE INDEX IF NOT EXISTS idx_rules_layout ON rules (layout_id);
";

/// Summary row for listing learned layouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLayout {
    /// Full hex layout signature.
    pub signature: String,

    /// RFC 3339 timestamp of when the layout was first learned.
    pub created_at: String,

    /// Number of rule rows attached to the layout.
    pub rule_count: usize,
}

/// Persistent rule store over a single SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteRuleStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRuleStore {
    /// Opens (or creates) the database at `path` and runs schema setup.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        debug!(path = %path.display(), "rule store opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Lists every learned layout, newest first.
    pub async fn list_layouts(&self) -> Result<Vec<StoredLayout>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            "SELECT l.signature, l.created_at, COUNT(r.id)
             FROM layouts l
             LEFT JOIN rules r ON r.layout_id = l.id
             GROUP BY l.id
             ORDER BY l.created_at DESC, l.id DESC",
        )?;
        let layouts = stmt
            .query_map([], |row| {
                Ok(StoredLayout {
                    signature: row.get(0)?,
                    created_at: row.get(1)?,
                    rule_count: row.get::<_, i64>(2)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(layouts)
    }

    /// Number of learned layouts, empty ones included.
    pub async fn layout_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().await;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM layouts", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[async_trait::async_trait]
impl RuleStore for SqliteRuleStore {
    async fn find_rules(&self, signature: &LayoutSignature) -> Result<Option<RuleSet>, StoreError> {
        let rows = {
            let conn = self.conn.lock().await;
            let mut stmt = conn.prepare_cached(
                "SELECT r.field_name, r.rule_json
                 FROM rules r
                 JOIN layouts l ON l.id = r.layout_id
                 WHERE l.signature = ?1",
            )?;
            stmt.query_map(params![signature.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?
        };

        if rows.is_empty() {
            return Ok(None);
        }

        let mut rules = RuleSet::new();
        for (field_name, rule_json) in rows {
            let Some(field) = DocField::from_name(&field_name) else {
                warn!(field = %field_name, "skipping rule for unknown field");
                continue;
            };
            let rule: ExtractionRule = serde_json::from_str(&rule_json)?;
            rules.insert(field, rule);
        }

        if rules.is_empty() {
            return Ok(None);
        }
        Ok(Some(rules))
    }

    async fn save(
        &self,
        signature: &LayoutSignature,
        rules: &RuleSet,
    ) -> Result<SaveOutcome, StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO layouts (signature, created_at) VALUES (?1, ?2)",
            params![signature.as_str(), Utc::now().to_rfc3339()],
        )?;
        if inserted == 0 {
            // Another writer already claimed this signature.
            return Ok(SaveOutcome::AlreadyExists);
        }

        let layout_id = tx.last_insert_rowid();
        for (field, rule) in rules.iter() {
            tx.execute(
                "INSERT INTO rules (layout_id, field_name, rule_json) VALUES (?1, ?2, ?3)",
                params![layout_id, field.as_str(), serde_json::to_string(rule)?],
            )?;
        }
        tx.commit()?;

        Ok(SaveOutcome::Inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn sample_rules() -> RuleSet {
        let mut rules = RuleSet::new();
        rules.insert(DocField::InvoiceId, ExtractionRule::regex(r"(INV\-\d+)"));
        rules.insert(DocField::VendorName, ExtractionRule::regex("(Acme Corp)"));
        rules
    }

    #[tokio::test]
    async fn test_save_and_find_round_trip() {
        let dir = tempdir().unwrap();
        let store = SqliteRuleStore::open(dir.path().join("rules.db")).await.unwrap();
        let sig = LayoutSignature::compute("invoice number 42");

        assert_eq!(store.find_rules(&sig).await.unwrap(), None);
        assert_eq!(
            store.save(&sig, &sample_rules()).await.unwrap(),
            SaveOutcome::Inserted
        );
        assert_eq!(store.find_rules(&sig).await.unwrap(), Some(sample_rules()));
    }

    #[tokio::test]
    async fn test_first_writer_wins() {
        let dir = tempdir().unwrap();
        let store = SqliteRuleStore::open(dir.path().join("rules.db")).await.unwrap();
        let sig = LayoutSignature::compute("invoice number 42");

        store.save(&sig, &sample_rules()).await.unwrap();

        let mut second = RuleSet::new();
        second.insert(DocField::TotalAmount, ExtractionRule::regex(r"(\$\d+)"));
        assert_eq!(
            store.save(&sig, &second).await.unwrap(),
            SaveOutcome::AlreadyExists
        );

        // The losing write must not leak any rule rows.
        assert_eq!(store.find_rules(&sig).await.unwrap(), Some(sample_rules()));
    }

    #[tokio::test]
    async fn test_empty_set_claims_signature_but_reads_absent() {
        let dir = tempdir().unwrap();
        let store = SqliteRuleStore::open(dir.path().join("rules.db")).await.unwrap();
        let sig = LayoutSignature::compute("layout the model could not learn");

        assert_eq!(
            store.save(&sig, &RuleSet::new()).await.unwrap(),
            SaveOutcome::Inserted
        );
        assert_eq!(store.find_rules(&sig).await.unwrap(), None);
        assert_eq!(
            store.save(&sig, &sample_rules()).await.unwrap(),
            SaveOutcome::AlreadyExists
        );
        assert_eq!(store.layout_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rules_survive_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("rules.db");
        let sig = LayoutSignature::compute("invoice number 42");

        {
            let store = SqliteRuleStore::open(&db_path).await.unwrap();
            store.save(&sig, &sample_rules()).await.unwrap();
        }

        let store = SqliteRuleStore::open(&db_path).await.unwrap();
        assert_eq!(store.find_rules(&sig).await.unwrap(), Some(sample_rules()));
    }

    #[tokio::test]
    async fn test_unknown_field_rows_are_skipped() {
        let dir = tempdir().unwrap();
        let store = SqliteRuleStore::open(dir.path().join("rules.db")).await.unwrap();
        let sig = LayoutSignature::compute("invoice number 42");
        store.save(&sig, &sample_rules()).await.unwrap();

        {
            let conn = store.conn.lock().await;
            conn.execute(
                "INSERT INTO rules (layout_id, field_name, rule_json)
                 SELECT l.id, 'purchase_order', '{\"pattern\":\"(PO\\\\d+)\",\"method\":\"regex\"}'
                 FROM layouts l WHERE l.signature = ?1",
                params![sig.as_str()],
            )
            .unwrap();
        }

        // The foreign row is ignored, the known fields still load.
        assert_eq!(store.find_rules(&sig).await.unwrap(), Some(sample_rules()));
    }

    #[tokio::test]
    async fn test_list_layouts_reports_counts() {
        let dir = tempdir().unwrap();
        let store = SqliteRuleStore::open(dir.path().join("rules.db")).await.unwrap();

        let full = LayoutSignature::compute("first layout");
        let empty = LayoutSignature::compute("second layout");
        store.save(&full, &sample_rules()).await.unwrap();
        store.save(&empty, &RuleSet::new()).await.unwrap();

        let layouts = store.list_layouts().await.unwrap();
        assert_eq!(layouts.len(), 2);

        let by_sig = |sig: &LayoutSignature| {
            layouts
                .iter()
                .find(|l| l.signature == sig.as_str())
                .unwrap()
                .clone()
        };
        assert_eq!(by_sig(&full).rule_count, 2);
        assert_eq!(by_sig(&empty).rule_count, 0);
    }

    #[tokio::test]
    async fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("data").join("nested").join("rules.db");
        let store = SqliteRuleStore::open(&nested).await.unwrap();
        assert_eq!(store.layout_count().await.unwrap(), 0);
        assert!(nested.exists());
    }
}
