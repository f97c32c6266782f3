// SPDX-FileCopyrightText: 2026 Haven Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use haven_core::HavenError;
use tracing::debug;

/// Handle to the snapshot database.
///
/// Holds a single key/value table; the queue stores its full serialized
/// request set under one key and overwrites it on every mutation.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

/// Map a tokio-rusqlite error into the workspace error type.
pub(crate) fn map_tr_err(err: tokio_rusqlite::Error) -> HavenError {
    HavenError::storage(err)
}

impl Database {
    /// Open (or create) the database at `path`, applying PRAGMAs and the
    /// kv schema.
    pub async fn open(path: &str) -> Result<Self, HavenError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| map_tr_err(e.into()))?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 CREATE TABLE IF NOT EXISTS kv (
                     key   TEXT PRIMARY KEY,
                     value TEXT NOT NULL
                 );",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, "snapshot database opened");
        Ok(Self { conn })
    }

    /// Returns the shared connection handle.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Read the raw value stored under `key`, if any.
    pub async fn get(&self, key: &str) -> Result<Option<String>, HavenError> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
                let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
                match stmt.query_row([key], |row| row.get(0)) {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await
            .map_err(map_tr_err)
    }

    /// Overwrite the value stored under `key`.
    pub async fn put(&self, key: &str, value: &str) -> Result<(), HavenError> {
        let key = key.to_string();
        let value = value.to_string();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO kv (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    [key, value],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoint the WAL, flushing pending writes to the main file.
    pub async fn checkpoint(&self) -> Result<(), HavenError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("kv.db").to_str().unwrap())
            .await
            .unwrap();

        assert!(db.get("missing").await.unwrap().is_none());

        db.put("k", "v1").await.unwrap();
        assert_eq!(db.get("k").await.unwrap().as_deref(), Some("v1"));

        // Overwrite replaces, never appends.
        db.put("k", "v2").await.unwrap();
        assert_eq!(db.get("k").await.unwrap().as_deref(), Some("v2"));

        db.checkpoint().await.unwrap();
    }
}
