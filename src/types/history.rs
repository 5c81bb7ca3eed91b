use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix carried by ids that were generated locally and not yet confirmed
/// by the remote store.
pub const PLACEHOLDER_PREFIX: &str = "temp_";

/// Maximum number of entries kept in the history list.
pub const HISTORY_LIMIT: usize = 20;

/// One remembered search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub query: String,
    pub result_count: u32,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Creates an entry with a fresh placeholder id.
    pub fn new_local(query: &str, result_count: u32, created_at: DateTime<Utc>) -> Self {
        Self {
            id: placeholder_id(created_at),
            query: query.to_string(),
            result_count,
            created_at,
        }
    }

    /// True while the entry still carries a locally generated id.
    pub fn is_placeholder(&self) -> bool {
        self.id.starts_with(PLACEHOLDER_PREFIX)
    }

    /// Case-insensitive comparison against a query string.
    pub fn matches_query(&self, query: &str) -> bool {
        self.query.to_lowercase() == query.to_lowercase()
    }
}

/// Builds a placeholder id of the form `temp_<millis>_<9 chars>`.
pub fn placeholder_id(at: DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();
    format!("{}{}_{}", PLACEHOLDER_PREFIX, at.timestamp_millis(), suffix)
}

/// A row of the `search_history` table as returned by a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub id: String,
    pub query: String,
    pub results_count: u32,
    pub created_at: DateTime<Utc>,
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        Self {
            id: row.id,
            query: row.query,
            result_count: row.results_count,
            created_at: row.created_at,
        }
    }
}
