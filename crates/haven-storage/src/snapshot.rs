// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the SnapshotStore trait.

use async_trait::async_trait;
use tracing::{debug, warn};

use haven_core::{normalize_snapshot, CrisisRequest, HavenError, SnapshotStore};

use crate::database::Database;

/// SQLite-backed snapshot store.
///
/// Persists the full request set as one JSON array under a fixed kv key,
/// overwriting it on every save. Loads parse defensively: a missing row,
/// unparseable JSON, or a non-array value all degrade to an empty set.
pub struct SqliteSnapshotStore {
    db: Database,
    key: String,
}

impl SqliteSnapshotStore {
    /// Open (or create) the store at `path`, keyed under `snapshot_key`.
    pub async fn open(path: &str, snapshot_key: &str) -> Result<Self, HavenError> {
        let db = Database::open(path).await?;
        Ok(Self {
            db,
            key: snapshot_key.to_string(),
        })
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn load(&self) -> Result<Vec<CrisisRequest>, HavenError> {
        let Some(raw) = self.db.get(&self.key).await? else {
            debug!(key = %self.key, "no persisted snapshot, starting empty");
            return Ok(Vec::new());
        };

        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "persisted snapshot unparseable, starting empty");
                return Ok(Vec::new());
            }
        };

        let requests = normalize_snapshot(&value);
        debug!(count = requests.len(), "snapshot loaded");
        Ok(requests)
    }

    async fn save(&self, requests: &[CrisisRequest]) -> Result<(), HavenError> {
        let serialized = serde_json::to_string(requests).map_err(HavenError::storage)?;
        self.db.put(&self.key, &serialized).await
    }

    async fn close(&self) -> Result<(), HavenError> {
        self.db.checkpoint().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_core::{CrisisLevel, CrisisStatus, RequestId, DEFAULT_TTL_MS, MIN_TTL_MS};
    use tempfile::tempdir;

    fn request(id: &str, timestamp: i64) -> CrisisRequest {
        CrisisRequest {
            id: RequestId::from(id),
            student_id: "s1".to_string(),
            crisis_level: CrisisLevel::High,
            status: CrisisStatus::Pending,
            timestamp,
            ttl: DEFAULT_TTL_MS,
            expires_at: timestamp + DEFAULT_TTL_MS,
            post_id: None,
            volunteer_id: None,
            metadata: None,
        }
    }

    async fn open_store(dir: &tempfile::TempDir) -> SqliteSnapshotStore {
        SqliteSnapshotStore::open(
            dir.path().join("snapshot.db").to_str().unwrap(),
            "crisis_queue_requests",
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn empty_store_loads_empty_set() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips_sorted() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;

        store
            .save(&[request("b", 200), request("a", 100)])
            .await
            .unwrap();

        let loaded = store.load().await.unwrap();
        let ids: Vec<&str> = loaded.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn save_overwrites_previous_snapshot() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;

        store.save(&[request("a", 100)]).await.unwrap();
        store.save(&[]).await.unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unparseable_raw_value_degrades_to_empty() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;

        store
            .database()
            .put("crisis_queue_requests", "{not json")
            .await
            .unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_entries_are_normalized_on_load() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;

        store
            .database()
            .put(
                "crisis_queue_requests",
                r#"[
                    {"id": "ok", "status": "mystery", "ttl": 7, "timestamp": 5},
                    null,
                    "garbage"
                ]"#,
            )
            .await
            .unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id.as_str(), "ok");
        assert_eq!(loaded[0].status, CrisisStatus::Pending);
        assert_eq!(loaded[0].ttl, MIN_TTL_MS);
    }
}
