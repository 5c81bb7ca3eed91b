//! SQLite-backed history repository.
//!
//! Stores history in the local [`Database`] using the same table layout as
//! the hosted store. Anonymous sessions write under a fixed local user id so
//! history survives restarts without an account.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, ErrorCode, OptionalExtension};
use uuid::Uuid;

use super::{HistoryRepository, UserScope};
use crate::database::Database;
use crate::types::article::Article;
use crate::types::errors::RepositoryError;
use crate::types::history::HistoryRow;
use crate::types::session::Session;

/// User id used for rows written without an account.
pub const LOCAL_USER_ID: &str = "local";

/// Maps a rusqlite failure onto the repository error kinds.
pub fn classify(err: rusqlite::Error) -> RepositoryError {
    let message = err.to_string();
    if message.contains("no such table") {
        return RepositoryError::TableMissing(message);
    }
    match err.sqlite_error_code() {
        Some(ErrorCode::ReadOnly) | Some(ErrorCode::PermissionDenied) | Some(ErrorCode::AuthorizationForStatementDenied) => {
            RepositoryError::PermissionDenied(message)
        }
        _ => RepositoryError::Unavailable(message),
    }
}

fn parse_timestamp(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

fn row_to_history(row: &rusqlite::Row) -> rusqlite::Result<HistoryRow> {
    let created: String = row.get(3)?;
    Ok(HistoryRow {
        id: row.get(0)?,
        query: row.get(1)?,
        results_count: row.get::<_, i64>(2)?.max(0) as u32,
        created_at: parse_timestamp(&created)?,
    })
}

/// History repository over a local SQLite database.
pub struct SqliteHistoryRepository {
    db: Mutex<Database>,
}

impl SqliteHistoryRepository {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Opens (or creates) the database file at `path`.
    pub fn open(path: &str) -> Result<Self, RepositoryError> {
        Database::open(path).map(Self::new).map_err(classify)
    }

    pub fn in_memory() -> Result<Self, RepositoryError> {
        Database::open_in_memory().map(Self::new).map_err(classify)
    }

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> rusqlite::Result<T>) -> Result<T, RepositoryError> {
        let db = self
            .db
            .lock()
            .map_err(|e| RepositoryError::Unavailable(format!("database lock poisoned: {}", e)))?;
        f(&db).map_err(classify)
    }

    /// Stores articles for a search so they can be replayed later, replacing
    /// any kept from an earlier run of the same search.
    pub fn store_articles(&self, search_id: &str, articles: &[Article]) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        self.with_db(|db| {
            let conn = db.connection();
            let tx = conn.unchecked_transaction()?;
            tx.execute("DELETE FROM articles WHERE search_id = ?1", params![search_id])?;
            for article in articles {
                tx.execute(
                    "INSERT INTO articles (id, search_id, title, url, snippet, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        Uuid::new_v4().to_string(),
                        search_id,
                        article.title,
                        article.url,
                        article.abstract_text,
                        now
                    ],
                )?;
            }
            tx.commit()
        })
    }

    /// Runs a closure against the raw connection. Used for maintenance and tests.
    pub fn with_connection<T>(&self, f: impl FnOnce(&rusqlite::Connection) -> rusqlite::Result<T>) -> Result<T, RepositoryError> {
        self.with_db(|db| f(db.connection()))
    }
}

#[async_trait]
impl HistoryRepository for SqliteHistoryRepository {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn scope_for(&self, session: &Session) -> Option<UserScope> {
        UserScope::from_session(session).or_else(|| {
            Some(UserScope {
                user_id: LOCAL_USER_ID.to_string(),
                token: None,
            })
        })
    }

    async fn health_check(&self, _scope: &UserScope) -> Result<(), RepositoryError> {
        self.with_db(|db| {
            db.connection()
                .query_row("SELECT COUNT(*) FROM search_history LIMIT 1", [], |row| row.get::<_, i64>(0))
                .map(|_| ())
        })
    }

    async fn list_recent(&self, scope: &UserScope, limit: usize) -> Result<Vec<HistoryRow>, RepositoryError> {
        self.with_db(|db| {
            let mut stmt = db.connection().prepare(
                "SELECT id, query, results_count, created_at FROM search_history \
                 WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![scope.user_id, limit as i64], row_to_history)?;
            rows.collect()
        })
    }

    async fn find_by_query(&self, scope: &UserScope, query: &str) -> Result<Option<HistoryRow>, RepositoryError> {
        self.with_db(|db| {
            db.connection()
                .query_row(
                    "SELECT id, query, results_count, created_at FROM search_history \
                     WHERE user_id = ?1 AND query = ?2 ORDER BY created_at DESC LIMIT 1",
                    params![scope.user_id, query],
                    row_to_history,
                )
                .optional()
        })
    }

    async fn find_by_id(&self, scope: &UserScope, id: &str) -> Result<Option<HistoryRow>, RepositoryError> {
        self.with_db(|db| {
            db.connection()
                .query_row(
                    "SELECT id, query, results_count, created_at FROM search_history \
                     WHERE user_id = ?1 AND id = ?2",
                    params![scope.user_id, id],
                    row_to_history,
                )
                .optional()
        })
    }

    async fn insert(
        &self,
        scope: &UserScope,
        query: &str,
        results_count: u32,
        created_at: DateTime<Utc>,
    ) -> Result<String, RepositoryError> {
        let id = Uuid::new_v4().to_string();
        self.with_db(|db| {
            db.connection().execute(
                "INSERT INTO search_history (id, user_id, query, results_count, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, scope.user_id, query, results_count, created_at.to_rfc3339()],
            )
        })?;
        Ok(id)
    }

    async fn update(
        &self,
        scope: &UserScope,
        id: &str,
        results_count: u32,
        created_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let affected = self.with_db(|db| {
            db.connection().execute(
                "UPDATE search_history SET results_count = ?1, created_at = ?2 WHERE id = ?3 AND user_id = ?4",
                params![results_count, created_at.to_rfc3339(), id, scope.user_id],
            )
        })?;
        if affected == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete_by_id(&self, scope: &UserScope, id: &str) -> Result<u64, RepositoryError> {
        self.with_db(|db| {
            db.connection().execute(
                "DELETE FROM search_history WHERE user_id = ?1 AND id = ?2",
                params![scope.user_id, id],
            )
        })
        .map(|n| n as u64)
    }

    async fn delete_by_query(&self, scope: &UserScope, query: &str) -> Result<u64, RepositoryError> {
        self.with_db(|db| {
            db.connection().execute(
                "DELETE FROM search_history WHERE user_id = ?1 AND query = ?2",
                params![scope.user_id, query],
            )
        })
        .map(|n| n as u64)
    }

    async fn articles_for_search(&self, _scope: &UserScope, search_id: &str) -> Result<Vec<Article>, RepositoryError> {
        self.with_db(|db| {
            let mut stmt = db.connection().prepare(
                "SELECT title, url, snippet FROM articles WHERE search_id = ?1 ORDER BY created_at DESC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![search_id], |row| {
                Ok(Article {
                    title: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    url: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    source: None,
                    year: None,
                    citations: None,
                    abstract_text: row.get(2)?,
                })
            })?;
            rows.collect()
        })
    }

    async fn save_articles(&self, _scope: &UserScope, search_id: &str, articles: &[Article]) -> Result<(), RepositoryError> {
        self.store_articles(search_id, articles)
    }
}
