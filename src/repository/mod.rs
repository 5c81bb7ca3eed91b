//! Storage abstraction for search history.
//!
//! [`HistoryRepository`] is the only seam between the history manager and a
//! persistence collaborator. Implementations translate their own error
//! vocabulary into [`RepositoryError`] so callers never match on raw codes.

pub mod rest;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::article::Article;
use crate::types::errors::RepositoryError;
use crate::types::history::HistoryRow;
use crate::types::session::{AccessToken, Session};

pub use rest::RestHistoryRepository;
pub use sqlite::SqliteHistoryRepository;

/// Identity under which rows are read and written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserScope {
    pub user_id: String,
    pub token: Option<AccessToken>,
}

impl UserScope {
    /// Scope for an authenticated session, `None` for anonymous users.
    pub fn from_session(session: &Session) -> Option<Self> {
        match session {
            Session::Authenticated { user_id, token, .. } => Some(Self {
                user_id: user_id.clone(),
                token: Some(token.clone()),
            }),
            Session::Anonymous => None,
        }
    }

    pub fn bearer(&self) -> Option<&str> {
        self.token.as_ref().map(|t| t.expose())
    }
}

/// Operations on the `search_history` table and its `articles`.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> &'static str;

    /// Resolves the scope rows are written under. Remote stores require an
    /// authenticated session.
    fn scope_for(&self, session: &Session) -> Option<UserScope> {
        UserScope::from_session(session)
    }

    /// Cheap probe that the table is reachable.
    async fn health_check(&self, scope: &UserScope) -> Result<(), RepositoryError>;

    /// Up to `limit` rows for the user, newest first.
    async fn list_recent(&self, scope: &UserScope, limit: usize) -> Result<Vec<HistoryRow>, RepositoryError>;

    /// Row with exactly this query text, if any.
    async fn find_by_query(&self, scope: &UserScope, query: &str) -> Result<Option<HistoryRow>, RepositoryError>;

    /// Row with this id, if any.
    async fn find_by_id(&self, scope: &UserScope, id: &str) -> Result<Option<HistoryRow>, RepositoryError>;

    /// Inserts a row and returns the store-assigned id.
    async fn insert(
        &self,
        scope: &UserScope,
        query: &str,
        results_count: u32,
        created_at: DateTime<Utc>,
    ) -> Result<String, RepositoryError>;

    async fn update(
        &self,
        scope: &UserScope,
        id: &str,
        results_count: u32,
        created_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Deletes by id, returning the number of removed rows.
    async fn delete_by_id(&self, scope: &UserScope, id: &str) -> Result<u64, RepositoryError>;

    /// Deletes by query text, returning the number of removed rows.
    async fn delete_by_query(&self, scope: &UserScope, query: &str) -> Result<u64, RepositoryError>;

    /// Articles stored for a past search, in the order they were returned.
    async fn articles_for_search(&self, scope: &UserScope, search_id: &str) -> Result<Vec<Article>, RepositoryError>;

    /// Replaces the articles kept for a search. Stores whose backend writes
    /// `articles` itself leave this as a no-op.
    async fn save_articles(&self, _scope: &UserScope, _search_id: &str, _articles: &[Article]) -> Result<(), RepositoryError> {
        Ok(())
    }
}
