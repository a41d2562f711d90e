//! SQLite-backed durable tier.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::store::DurableStore;
use super::types::{CacheEntry, IndexRecord, SessionId, StoreError};
use crate::job::Artifact;

/// SQLite-backed result store.
pub struct SqliteResultStore {
    conn: Mutex<Connection>,
}

impl SqliteResultStore {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS results (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                output_name TEXT NOT NULL,
                details TEXT,
                mime TEXT NOT NULL,
                bytes BLOB NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_results_created_at ON results(created_at, id);
            CREATE INDEX IF NOT EXISTS idx_results_session_id ON results(session_id);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

/// Fixed-width UTC timestamps, so text order is time order.
fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(id: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            id: id.to_string(),
            reason: format!("created_at {:?}: {}", raw, e),
        })
}

fn index_row(row: &rusqlite::Row) -> rusqlite::Result<(String, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn collect_index(
    rows: impl Iterator<Item = rusqlite::Result<(String, String, String)>>,
) -> Result<Vec<IndexRecord>, StoreError> {
    let mut records = Vec::new();
    for row in rows {
        let (id, session_id, created_at) = row?;
        let created_at = parse_timestamp(&id, &created_at)?;
        records.push(IndexRecord {
            id,
            session_id: SessionId::from(session_id),
            created_at,
        });
    }
    Ok(records)
}

impl DurableStore for SqliteResultStore {
    fn put(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO results (id, session_id, created_at, output_name, details, mime, bytes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.session_id.as_str(),
                format_timestamp(&entry.created_at),
                entry.output_name,
                entry.details,
                entry.artifact.mime,
                &entry.artifact.bytes[..],
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<CacheEntry>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, session_id, created_at, output_name, details, mime, bytes FROM results WHERE id = ?",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, Vec<u8>>(6)?,
                    ))
                },
            )
            .optional()?;
        drop(conn);

        let Some((id, session_id, created_at, output_name, details, mime, bytes)) = row else {
            return Ok(None);
        };
        let created_at = parse_timestamp(&id, &created_at)?;
        Ok(Some(CacheEntry {
            id,
            session_id: SessionId::from(session_id),
            created_at,
            output_name,
            details,
            artifact: Artifact::new(bytes, mime),
        }))
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM results WHERE id = ?", params![id])?;
        Ok(removed > 0)
    }

    fn scan_by_created_at(&self) -> Result<Vec<IndexRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, session_id, created_at FROM results ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map([], index_row)?;
        collect_index(rows)
    }

    fn scan_by_session(&self, session_id: &SessionId) -> Result<Vec<IndexRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, session_id, created_at FROM results WHERE session_id = ? ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map(params![session_id.as_str()], index_row)?;
        collect_index(rows)
    }

    fn delete_many(&self, ids: &[String]) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM results WHERE id = ?")?;
            for id in ids {
                removed += stmt.execute(params![id])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }
}
