//! SQLite-backed replication history via libsql.
//!
//! Uses the same libsql backend as grammers-session to avoid duplicate
//! SQLite symbol link errors. Three tables with natural primary keys;
//! writes use INSERT OR IGNORE so replays are harmless and a recovered
//! row is authoritative after a crash.

use crate::domain::{ChannelId, DomainError};
use crate::ports::HistoryPort;
use libsql::{params, Database};
use std::collections::HashSet;
use std::path::Path;

const SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS forwards (
    source INTEGER NOT NULL,
    message_id INTEGER NOT NULL,
    target INTEGER NOT NULL,
    ts INTEGER NOT NULL,
    PRIMARY KEY (source, message_id, target)
)"#,
    "CREATE INDEX IF NOT EXISTS idx_forwards_range ON forwards (source, target, message_id)",
    r#"
CREATE TABLE IF NOT EXISTS uploads (
    hash TEXT NOT NULL,
    target INTEGER NOT NULL,
    ts INTEGER NOT NULL,
    PRIMARY KEY (hash, target)
)"#,
    r#"
CREATE TABLE IF NOT EXISTS downloads (
    source INTEGER NOT NULL,
    message_id INTEGER NOT NULL,
    ts INTEGER NOT NULL,
    PRIMARY KEY (source, message_id)
)"#,
];

/// One database file (history.db) in the given base directory. Safe to
/// share via Arc; libsql serializes writers internally.
pub struct SqliteHistory {
    db: Database,
}

impl SqliteHistory {
    /// Open (or create) the database and ensure the schema exists.
    pub async fn connect(base_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(|e| DomainError::History(e.to_string()))?;
        let db_path = base.join("history.db");
        let path_str = db_path.to_string_lossy();
        let db = libsql::Builder::new_local(path_str.as_ref())
            .build()
            .await
            .map_err(|e| DomainError::History(e.to_string()))?;
        let conn = db.connect().map_err(|e| DomainError::History(e.to_string()))?;
        for stmt in SCHEMA {
            conn.execute(stmt, ())
                .await
                .map_err(|e| DomainError::History(e.to_string()))?;
        }
        Ok(Self { db })
    }

    fn conn(&self) -> Result<libsql::Connection, DomainError> {
        self.db
            .connect()
            .map_err(|e| DomainError::History(e.to_string()))
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[async_trait::async_trait]
impl HistoryPort for SqliteHistory {
    async fn is_forwarded(
        &self,
        source: ChannelId,
        message_id: i32,
        target: ChannelId,
    ) -> Result<bool, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT 1 FROM forwards WHERE source = ?1 AND message_id = ?2 AND target = ?3",
                params![source, message_id, target],
            )
            .await
            .map_err(|e| DomainError::History(e.to_string()))?;
        Ok(rows
            .next()
            .await
            .map_err(|e| DomainError::History(e.to_string()))?
            .is_some())
    }

    async fn mark_forwarded(
        &self,
        source: ChannelId,
        message_id: i32,
        target: ChannelId,
    ) -> Result<(), DomainError> {
        self.mark_forwarded_many(source, &[message_id], target).await
    }

    async fn mark_forwarded_many(
        &self,
        source: ChannelId,
        message_ids: &[i32],
        target: ChannelId,
    ) -> Result<(), DomainError> {
        if message_ids.is_empty() {
            return Ok(());
        }
        let conn = self.conn()?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| DomainError::History(e.to_string()))?;
        let ts = Self::now();
        for &id in message_ids {
            tx.execute(
                r#"
                INSERT INTO forwards (source, message_id, target, ts)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT (source, message_id, target) DO NOTHING
                "#,
                params![source, id, target, ts],
            )
            .await
            .map_err(|e| DomainError::History(e.to_string()))?;
        }
        tx.commit()
            .await
            .map_err(|e| DomainError::History(e.to_string()))?;
        Ok(())
    }

    async fn unforwarded_in_range(
        &self,
        source: ChannelId,
        start_id: i32,
        end_id: i32,
        targets: &[ChannelId],
    ) -> Result<Vec<i32>, DomainError> {
        if start_id > end_id || targets.is_empty() {
            return Ok(vec![]);
        }
        let conn = self.conn()?;

        // Per-target forwarded sets; an id is done only when every target
        // has it.
        let mut per_target: Vec<HashSet<i32>> = Vec::with_capacity(targets.len());
        for &target in targets {
            let mut rows = conn
                .query(
                    r#"
                    SELECT message_id FROM forwards
                    WHERE source = ?1 AND target = ?2
                      AND message_id BETWEEN ?3 AND ?4
                    "#,
                    params![source, target, start_id, end_id],
                )
                .await
                .map_err(|e| DomainError::History(e.to_string()))?;
            let mut set = HashSet::new();
            while let Some(row) = rows
                .next()
                .await
                .map_err(|e| DomainError::History(e.to_string()))?
            {
                let id: i32 = row.get(0).map_err(|e| DomainError::History(e.to_string()))?;
                set.insert(id);
            }
            per_target.push(set);
        }

        Ok((start_id..=end_id)
            .filter(|id| !per_target.iter().all(|set| set.contains(id)))
            .collect())
    }

    async fn count_forwarded_in_range(
        &self,
        source: ChannelId,
        start_id: i32,
        end_id: i32,
        target: ChannelId,
    ) -> Result<u64, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                r#"
                SELECT COUNT(*) FROM forwards
                WHERE source = ?1 AND target = ?2
                  AND message_id BETWEEN ?3 AND ?4
                "#,
                params![source, target, start_id, end_id],
            )
            .await
            .map_err(|e| DomainError::History(e.to_string()))?;
        let row = rows
            .next()
            .await
            .map_err(|e| DomainError::History(e.to_string()))?
            .ok_or_else(|| DomainError::History("count returned no row".into()))?;
        let count: i64 = row.get(0).map_err(|e| DomainError::History(e.to_string()))?;
        Ok(count as u64)
    }

    async fn is_uploaded(&self, sha256: &str, target: ChannelId) -> Result<bool, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT 1 FROM uploads WHERE hash = ?1 AND target = ?2",
                params![sha256, target],
            )
            .await
            .map_err(|e| DomainError::History(e.to_string()))?;
        Ok(rows
            .next()
            .await
            .map_err(|e| DomainError::History(e.to_string()))?
            .is_some())
    }

    async fn mark_uploaded(&self, sha256: &str, target: ChannelId) -> Result<(), DomainError> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO uploads (hash, target, ts) VALUES (?1, ?2, ?3)
            ON CONFLICT (hash, target) DO NOTHING
            "#,
            params![sha256, target, Self::now()],
        )
        .await
        .map_err(|e| DomainError::History(e.to_string()))?;
        Ok(())
    }

    async fn is_downloaded(
        &self,
        source: ChannelId,
        message_id: i32,
    ) -> Result<bool, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT 1 FROM downloads WHERE source = ?1 AND message_id = ?2",
                params![source, message_id],
            )
            .await
            .map_err(|e| DomainError::History(e.to_string()))?;
        Ok(rows
            .next()
            .await
            .map_err(|e| DomainError::History(e.to_string()))?
            .is_some())
    }

    async fn mark_downloaded(
        &self,
        source: ChannelId,
        message_id: i32,
    ) -> Result<(), DomainError> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO downloads (source, message_id, ts) VALUES (?1, ?2, ?3)
            ON CONFLICT (source, message_id) DO NOTHING
            "#,
            params![source, message_id, Self::now()],
        )
        .await
        .map_err(|e| DomainError::History(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (SqliteHistory, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let store = SqliteHistory::connect(tmp.path()).await.unwrap();
        (store, tmp)
    }

    #[tokio::test]
    async fn forwards_roundtrip_and_replay_is_harmless() {
        let (store, _tmp) = store().await;
        assert!(!store.is_forwarded(-1, 10, -2).await.unwrap());

        store.mark_forwarded(-1, 10, -2).await.unwrap();
        store.mark_forwarded(-1, 10, -2).await.unwrap();
        assert!(store.is_forwarded(-1, 10, -2).await.unwrap());
        // Same id, different target: independent row.
        assert!(!store.is_forwarded(-1, 10, -3).await.unwrap());
        assert_eq!(store.count_forwarded_in_range(-1, 1, 100, -2).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn batch_mark_is_atomic_per_target() {
        let (store, _tmp) = store().await;
        store.mark_forwarded_many(-1, &[5, 6, 7], -2).await.unwrap();
        for id in [5, 6, 7] {
            assert!(store.is_forwarded(-1, id, -2).await.unwrap());
        }
        assert_eq!(store.count_forwarded_in_range(-1, 5, 7, -2).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn range_prefilter_requires_every_target() {
        let (store, _tmp) = store().await;
        store.mark_forwarded_many(-1, &[1, 2, 3], -2).await.unwrap();
        store.mark_forwarded_many(-1, &[2], -3).await.unwrap();

        // Only id 2 reached both targets.
        let missing = store
            .unforwarded_in_range(-1, 1, 4, &[-2, -3])
            .await
            .unwrap();
        assert_eq!(missing, vec![1, 3, 4]);

        let single = store.unforwarded_in_range(-1, 1, 4, &[-2]).await.unwrap();
        assert_eq!(single, vec![4]);
    }

    #[tokio::test]
    async fn upload_fingerprints_are_per_target() {
        let (store, _tmp) = store().await;
        let hash = "a".repeat(64);
        store.mark_uploaded(&hash, -2).await.unwrap();
        assert!(store.is_uploaded(&hash, -2).await.unwrap());
        assert!(!store.is_uploaded(&hash, -3).await.unwrap());
    }

    #[tokio::test]
    async fn downloads_are_keyed_by_source_message() {
        let (store, _tmp) = store().await;
        store.mark_downloaded(-1, 42).await.unwrap();
        assert!(store.is_downloaded(-1, 42).await.unwrap());
        assert!(!store.is_downloaded(-1, 43).await.unwrap());
        assert!(!store.is_downloaded(-2, 42).await.unwrap());
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let store = SqliteHistory::connect(tmp.path()).await.unwrap();
            store.mark_forwarded(-1, 10, -2).await.unwrap();
        }
        let reopened = SqliteHistory::connect(tmp.path()).await.unwrap();
        assert!(reopened.is_forwarded(-1, 10, -2).await.unwrap());
    }
}
