//! History Manager for the research assistant.
//!
//! Keeps the list of recent searches in memory as the source of truth for
//! the UI and mirrors every change to a [`HistoryRepository`] on a best-effort
//! basis. Local updates never wait on the network and are never rolled back
//! because a remote call failed.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::repository::{HistoryRepository, UserScope};
use crate::types::article::Article;
use crate::types::errors::{DataUnavailable, DeleteError};
use crate::types::history::{HistoryEntry, HistoryRow, HISTORY_LIMIT};
use crate::types::session::Session;

/// Handle to a background mirror task. Dropping it does not cancel the task.
#[derive(Debug, Default)]
pub struct MirrorHandle(Option<JoinHandle<()>>);

impl MirrorHandle {
    /// True when a mirror task was started.
    pub fn is_spawned(&self) -> bool {
        self.0.is_some()
    }

    /// Waits for the mirror task to finish. Returns immediately if none was started.
    pub async fn wait(self) {
        if let Some(handle) = self.0 {
            if let Err(e) = handle.await {
                warn!(error = %e, "history mirror task aborted");
            }
        }
    }
}

/// Local-first search history with remote mirroring.
#[derive(Clone)]
pub struct HistoryManager {
    entries: Arc<Mutex<Vec<HistoryEntry>>>,
    repository: Option<Arc<dyn HistoryRepository>>,
    mirror_enabled: bool,
    limit: usize,
}

impl HistoryManager {
    /// Creates a manager. `repository` is `None` when no store is configured,
    /// in which case history is kept in memory only.
    pub fn new(repository: Option<Arc<dyn HistoryRepository>>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            repository,
            mirror_enabled: true,
            limit: HISTORY_LIMIT,
        }
    }

    /// Keeps local history but stops writing changes to the repository.
    pub fn with_mirroring(mut self, enabled: bool) -> Self {
        self.mirror_enabled = enabled;
        self
    }

    pub fn has_repository(&self) -> bool {
        self.repository.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<HistoryEntry>> {
        lock_entries(&self.entries)
    }

    /// Snapshot of the current list, most recent first.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Entry whose query matches case-insensitively.
    pub fn find_by_query(&self, query: &str) -> Option<HistoryEntry> {
        self.lock().iter().find(|e| e.matches_query(query)).cloned()
    }

    pub fn find_by_id(&self, id: &str) -> Option<HistoryEntry> {
        self.lock().iter().find(|e| e.id == id).cloned()
    }

    /// Drops all local entries. Remote rows are untouched.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Records a completed search.
    ///
    /// A query already present (case-insensitive) has its count and timestamp
    /// updated and moves to the front; otherwise a placeholder-id entry is
    /// inserted at the front and the list is truncated. The remote mirror runs
    /// in a spawned task; the returned handle may be awaited or ignored.
    pub fn record_search(&self, session: &Session, query: &str, result_count: u32) -> MirrorHandle {
        self.record(session, query, result_count, Vec::new())
    }

    /// Records a search together with the articles it returned. The articles
    /// are saved under the confirmed row id once the mirror succeeds.
    pub fn record_results(&self, session: &Session, query: &str, articles: &[Article]) -> MirrorHandle {
        self.record(session, query, articles.len() as u32, articles.to_vec())
    }

    fn record(&self, session: &Session, query: &str, result_count: u32, articles: Vec<Article>) -> MirrorHandle {
        let now = Utc::now();
        let (canonical_query, recorded_at) = {
            let mut entries = self.lock();
            match entries.iter().position(|e| e.matches_query(query)) {
                Some(pos) => {
                    let mut entry = entries.remove(pos);
                    entry.result_count = result_count;
                    entry.created_at = now.max(entry.created_at);
                    let out = (entry.query.clone(), entry.created_at);
                    entries.insert(0, entry);
                    out
                }
                None => {
                    let entry = HistoryEntry::new_local(query, result_count, now);
                    let out = (entry.query.clone(), entry.created_at);
                    entries.insert(0, entry);
                    entries.truncate(self.limit);
                    out
                }
            }
        };
        debug!(query = %canonical_query, result_count, "recorded search locally");

        if !self.mirror_enabled {
            return MirrorHandle::default();
        }
        let Some(repo) = self.repository.clone() else {
            debug!("skipping history mirror: no store configured");
            return MirrorHandle::default();
        };
        let Some(scope) = repo.scope_for(session) else {
            debug!("skipping history mirror: user not authenticated");
            return MirrorHandle::default();
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("skipping history mirror: no async runtime available");
            return MirrorHandle::default();
        };

        let entries = Arc::clone(&self.entries);
        MirrorHandle(Some(runtime.spawn(async move {
            let record = MirrorRecord {
                query: canonical_query,
                result_count,
                recorded_at,
                articles,
            };
            mirror_search(repo, entries, scope, record).await;
        })))
    }

    /// Replaces local state with the user's most recent rows.
    ///
    /// On any failure local state is cleared rather than left stale. Without
    /// a configured store the local list is kept as is.
    pub async fn load_history(&self, session: &Session) -> Result<usize, DataUnavailable> {
        let Some(repo) = self.repository.as_ref() else {
            return Ok(self.len());
        };
        let Some(scope) = repo.scope_for(session) else {
            self.clear();
            return Ok(0);
        };

        match repo.list_recent(&scope, self.limit).await {
            Ok(rows) => {
                let loaded = newest_per_query(rows, self.limit);
                let count = loaded.len();
                *self.lock() = loaded;
                info!(user = %scope.user_id, count, store = repo.name(), "loaded search history");
                Ok(count)
            }
            Err(e) => {
                self.clear();
                let condition = DataUnavailable::from(e.clone());
                error!(error = %e, condition = condition.tag(), "failed to load search history");
                Err(condition)
            }
        }
    }

    /// Deletes an entry remotely, then locally.
    ///
    /// A row that no longer exists remotely counts as already deleted. If the
    /// id-keyed delete fails the query text is used as a fallback key. The
    /// local entry is kept only when every remote attempt hard-failed.
    pub async fn delete_entry(&self, session: &Session, entry: &HistoryEntry) -> Result<(), DeleteError> {
        let scope = self
            .repository
            .as_ref()
            .and_then(|repo| repo.scope_for(session).map(|scope| (Arc::clone(repo), scope)));
        let Some((repo, scope)) = scope else {
            debug!(id = %entry.id, "no store connection, removing history entry locally");
            self.remove_local(entry);
            return Ok(());
        };

        // A placeholder id never exists remotely; the query text is the only key.
        if entry.is_placeholder() {
            return match repo.delete_by_query(&scope, &entry.query).await {
                Ok(n) => {
                    debug!(query = %entry.query, deleted = n, "deleted unconfirmed entry by query");
                    self.remove_local(entry);
                    Ok(())
                }
                Err(e) => {
                    error!(error = %e, query = %entry.query, "failed to delete unconfirmed entry");
                    Err(DeleteError::DeleteFailed(e.to_string()))
                }
            };
        }

        match repo.find_by_id(&scope, &entry.id).await {
            Ok(None) => {
                info!(id = %entry.id, "history row already gone remotely");
                self.remove_local(entry);
                return Ok(());
            }
            Ok(Some(_)) => {}
            Err(e) => warn!(error = %e, id = %entry.id, "could not verify history row before delete"),
        }

        if let Err(e) = repo.delete_by_id(&scope, &entry.id).await {
            warn!(error = %e, id = %entry.id, "delete by id failed, retrying by query");
            if let Err(fallback) = repo.delete_by_query(&scope, &entry.query).await {
                error!(error = %fallback, query = %entry.query, "fallback delete by query failed");
                return Err(DeleteError::DeleteFailed(fallback.to_string()));
            }
        }

        self.remove_local(entry);
        Ok(())
    }

    fn remove_local(&self, target: &HistoryEntry) {
        self.lock()
            .retain(|e| e.id != target.id && !e.matches_query(&target.query));
    }

    /// One-line status of the remote store, suitable for display.
    pub async fn check_connection(&self, session: &Session) -> String {
        let Some(repo) = self.repository.as_ref() else {
            return "Remote store not configured; history is kept locally".to_string();
        };
        let Some(scope) = repo.scope_for(session) else {
            return "Sign in to sync search history".to_string();
        };
        match repo.health_check(&scope).await {
            Ok(()) => "Database connection successful!".to_string(),
            Err(e) => format!("Connection failed: {}", e),
        }
    }
}

fn lock_entries(entries: &Mutex<Vec<HistoryEntry>>) -> MutexGuard<'_, Vec<HistoryEntry>> {
    // A panic while holding the lock cannot leave the Vec half-updated.
    entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Keeps the first row seen for each query text, compared case-insensitively.
/// Rows arrive newest first, so the newest row wins.
fn newest_per_query(rows: Vec<HistoryRow>, limit: usize) -> Vec<HistoryEntry> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(row.query.to_lowercase()))
        .take(limit)
        .map(HistoryEntry::from)
        .collect()
}

/// Writes one recorded search to the repository and swaps in the confirmed id.
struct MirrorRecord {
    query: String,
    result_count: u32,
    recorded_at: chrono::DateTime<Utc>,
    articles: Vec<Article>,
}

async fn mirror_search(
    repo: Arc<dyn HistoryRepository>,
    entries: Arc<Mutex<Vec<HistoryEntry>>>,
    scope: UserScope,
    record: MirrorRecord,
) {
    let MirrorRecord {
        query,
        result_count,
        recorded_at,
        articles,
    } = record;
    if let Err(e) = repo.health_check(&scope).await {
        warn!(error = %e, store = repo.name(), "store health check failed, skipping history mirror");
        return;
    }

    let existing = match repo.find_by_query(&scope, &query).await {
        Ok(row) => row,
        Err(e) => {
            warn!(error = %e, query = %query, "lookup of existing history row failed");
            None
        }
    };

    let record_id = match existing {
        Some(row) => match repo.update(&scope, &row.id, result_count, recorded_at).await {
            Ok(()) => {
                debug!(id = %row.id, "updated existing history row");
                Some(row.id)
            }
            Err(e) => {
                warn!(error = %e, id = %row.id, "updating history row failed");
                None
            }
        },
        None => match repo.insert(&scope, &query, result_count, recorded_at).await {
            Ok(id) => {
                debug!(id = %id, "inserted history row");
                Some(id)
            }
            Err(e) => {
                warn!(error = %e, query = %query, "inserting history row failed");
                None
            }
        },
    };

    if let Some(id) = record_id {
        if !articles.is_empty() {
            if let Err(e) = repo.save_articles(&scope, &id, &articles).await {
                warn!(error = %e, id = %id, "saving search results failed");
            }
        }
        let mut entries = lock_entries(&entries);
        if let Some(entry) = entries
            .iter_mut()
            .find(|e| e.is_placeholder() && e.matches_query(&query))
        {
            entry.id = id;
        }
    }
}
