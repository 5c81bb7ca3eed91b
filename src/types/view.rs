use serde::Serialize;

use super::article::Article;

/// What the results pane is currently showing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ViewMode {
    /// Nothing has been searched yet.
    #[default]
    Idle,
    /// Results of a search the user just submitted. Recorded in history.
    Fresh { query: String },
    /// Results reopened from a history entry. Never recorded again.
    Replay {
        query: String,
        search_id: Option<String>,
    },
}

impl ViewMode {
    pub fn records_history(&self) -> bool {
        matches!(self, ViewMode::Fresh { .. })
    }

    pub fn query(&self) -> Option<&str> {
        match self {
            ViewMode::Idle => None,
            ViewMode::Fresh { query } | ViewMode::Replay { query, .. } => Some(query),
        }
    }
}

/// Where the displayed articles came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOrigin {
    /// Parsed from the query endpoint's stream.
    Live,
    /// The stream carried no parseable line; demo data substituted.
    Fallback,
    /// The request failed; a single error article is shown.
    Failed,
    /// Loaded from stored articles of a past search.
    Replayed,
}

/// The result set currently on display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub query: String,
    pub articles: Vec<Article>,
    pub origin: ResultOrigin,
}
