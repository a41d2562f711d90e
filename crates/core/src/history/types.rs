use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A completed conversion, as shown in "recent conversions".
///
/// Only metadata is kept. `cache_id` pointed at a live cache entry when the
/// record was made but may have expired since, so callers must look it up
/// again before offering a download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub input_name: String,
    pub target_format: String,
    pub output_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub cache_id: String,
    /// Whether the durable tier accepted the artifact.
    pub persisted: bool,
}
