//! Types for the result cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::job::{Artifact, ConversionResult};

/// Identity of one user session.
///
/// Durable entries are only ever visible to the session that wrote them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// A fresh random session id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cached conversion result.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// The job id.
    pub id: String,
    pub session_id: SessionId,
    pub created_at: DateTime<Utc>,
    pub output_name: String,
    pub details: Option<String>,
    pub artifact: Artifact,
}

impl CacheEntry {
    /// Entry for a finished job, stamped `created_at`.
    pub fn from_result(
        result: &ConversionResult,
        session_id: SessionId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: result.job_id.clone(),
            session_id,
            created_at,
            output_name: result.output_name.clone(),
            details: result.details.clone(),
            artifact: result.artifact.clone(),
        }
    }
}

/// Index row of the durable tier, without the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    pub id: String,
    pub session_id: SessionId,
    pub created_at: DateTime<Utc>,
}

/// Durable tier failures. The cache absorbs these and keeps serving from
/// memory.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Durable storage unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn test_session_id_serializes_as_string() {
        let id = SessionId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        assert_eq!(id.to_string(), "abc");
    }

    #[test]
    fn test_entry_from_result() {
        let result = ConversionResult {
            job_id: "job-1".to_string(),
            artifact: Artifact::new(b"pdf".to_vec(), "application/pdf"),
            output_name: "a.pdf".to_string(),
            details: Some("12 characters".to_string()),
            preview_url: None,
        };
        let now = Utc::now();
        let entry = CacheEntry::from_result(&result, SessionId::from("s"), now);
        assert_eq!(entry.id, "job-1");
        assert_eq!(entry.output_name, "a.pdf");
        assert_eq!(entry.created_at, now);
    }
}
