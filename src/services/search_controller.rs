//! Search/results controller.
//!
//! Accepts queries, runs them against the query endpoint, keeps the result
//! set on display and forwards fresh searches to the [`HistoryManager`].
//! Reopening a history entry switches to [`ViewMode::Replay`], which never
//! records itself again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{error, info, warn};

use crate::managers::history_manager::{HistoryManager, MirrorHandle};
use crate::repository::HistoryRepository;
use crate::services::search_client::{parse_response, QueryClient};
use crate::types::article::{fallback_articles, Article};
use crate::types::errors::SearchError;
use crate::types::session::Session;
use crate::types::view::{ResultOrigin, SearchOutcome, ViewMode};

const FETCH_FAILED_MESSAGE: &str = "Failed to fetch search results. Please try again.";

/// Derives a display source from an article URL: host without `www.`,
/// first letter upper-cased.
pub fn source_from_url(raw: &str) -> String {
    let host = url::Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.replacen("www.", "", 1)));
    match host {
        Some(host) if !host.is_empty() => {
            let mut chars = host.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => "Unknown Source".to_string(),
            }
        }
        _ => "Unknown Source".to_string(),
    }
}

#[derive(Debug, Default)]
struct ViewState {
    mode: ViewMode,
    outcome: Option<SearchOutcome>,
}

/// Clears the loading flag when a request finishes, however it finishes.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, SearchError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| SearchError::Busy)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives query submission and the results pane.
pub struct SearchController {
    client: QueryClient,
    history: HistoryManager,
    repository: Option<Arc<dyn HistoryRepository>>,
    state: Mutex<ViewState>,
    loading: AtomicBool,
}

impl SearchController {
    pub fn new(client: QueryClient, history: HistoryManager, repository: Option<Arc<dyn HistoryRepository>>) -> Self {
        Self {
            client,
            history,
            repository,
            state: Mutex::new(ViewState::default()),
            loading: AtomicBool::new(false),
        }
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    pub fn mode(&self) -> ViewMode {
        self.state().mode.clone()
    }

    /// The result set on display, if any.
    pub fn results(&self) -> Option<SearchOutcome> {
        self.state().outcome.clone()
    }

    /// Returns to the empty search page.
    pub fn reset(&self) {
        let mut state = self.state();
        state.mode = ViewMode::Idle;
        state.outcome = None;
    }

    /// Submits a fresh search and records it in history when it produced results.
    pub async fn submit(&self, query: &str, session: &Session) -> Result<SearchOutcome, SearchError> {
        self.submit_tracked(query, session).await.map(|(outcome, _)| outcome)
    }

    /// Like [`submit`](Self::submit), also returning the history mirror handle.
    pub async fn submit_tracked(
        &self,
        query: &str,
        session: &Session,
    ) -> Result<(SearchOutcome, MirrorHandle), SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let _loading = InFlight::acquire(&self.loading)?;

        {
            let mut state = self.state();
            state.mode = ViewMode::Fresh {
                query: query.to_string(),
            };
            state.outcome = None;
        }

        let outcome = self.run_query(query, session).await;

        let records = matches!(outcome.origin, ResultOrigin::Live | ResultOrigin::Fallback)
            && !outcome.articles.is_empty();
        let mut mirror = MirrorHandle::default();
        {
            let mut state = self.state();
            if records && state.mode.records_history() && state.mode.query() == Some(query) {
                mirror = match outcome.origin {
                    ResultOrigin::Live => self.history.record_results(session, query, &outcome.articles),
                    _ => self
                        .history
                        .record_search(session, query, outcome.articles.len() as u32),
                };
            }
            state.outcome = Some(outcome.clone());
        }
        Ok((outcome, mirror))
    }

    /// Reopens a past search. Stored articles are shown when available;
    /// otherwise the query is re-run. Neither path records history.
    pub async fn open_history(
        &self,
        query: &str,
        search_id: Option<&str>,
        session: &Session,
    ) -> Result<SearchOutcome, SearchError> {
        // Taken before the mode changes: a rejected replay must not touch the view.
        let _loading = InFlight::acquire(&self.loading)?;
        {
            let mut state = self.state();
            state.mode = ViewMode::Replay {
                query: query.to_string(),
                search_id: search_id.map(str::to_string),
            };
        }

        if let Some(articles) = self.stored_articles(search_id, session).await {
            let outcome = SearchOutcome {
                query: query.to_string(),
                articles,
                origin: ResultOrigin::Replayed,
            };
            self.state().outcome = Some(outcome.clone());
            return Ok(outcome);
        }

        let outcome = self.run_query(query, session).await;
        self.state().outcome = Some(outcome.clone());
        Ok(outcome)
    }

    async fn stored_articles(&self, search_id: Option<&str>, session: &Session) -> Option<Vec<Article>> {
        let search_id = search_id?;
        let repo = self.repository.as_ref()?;
        let scope = repo.scope_for(session)?;
        match repo.articles_for_search(&scope, search_id).await {
            Ok(articles) if !articles.is_empty() => Some(
                articles
                    .into_iter()
                    .map(|mut a| {
                        if a.title.is_empty() {
                            a.title = "Untitled".to_string();
                        }
                        if a.url.is_empty() {
                            a.url = "#".to_string();
                        }
                        if a.source.is_none() {
                            a.source = Some(source_from_url(&a.url));
                        }
                        a
                    })
                    .collect(),
            ),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, search_id, "could not retrieve stored results, re-running search");
                None
            }
        }
    }

    async fn run_query(&self, query: &str, session: &Session) -> SearchOutcome {
        match self.client.fetch(query, session.bearer()).await {
            Ok(body) => match parse_response(&body) {
                Some(parsed) => {
                    info!(query, count = parsed.articles.len(), "search completed");
                    SearchOutcome {
                        query: query.to_string(),
                        articles: parsed.articles,
                        origin: ResultOrigin::Live,
                    }
                }
                None => {
                    warn!(query, "no structured line in query response, showing sample results");
                    SearchOutcome {
                        query: query.to_string(),
                        articles: fallback_articles(),
                        origin: ResultOrigin::Fallback,
                    }
                }
            },
            Err(e) => {
                error!(error = %e, query, "search request failed");
                SearchOutcome {
                    query: query.to_string(),
                    articles: vec![Article::error(FETCH_FAILED_MESSAGE)],
                    origin: ResultOrigin::Failed,
                }
            }
        }
    }
}
