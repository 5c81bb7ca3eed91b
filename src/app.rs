//! App Core for the research assistant.
//!
//! Central struct owning the configuration, the shared HTTP client, the
//! history repository and every component. Built once at startup and passed
//! by reference to whichever front end drives it.

use std::sync::{Arc, Mutex, MutexGuard};

use reqwest::Client;
use tracing::{info, warn};

use crate::managers::history_manager::HistoryManager;
use crate::repository::{HistoryRepository, RestHistoryRepository, SqliteHistoryRepository};
use crate::services::auth_client::AuthClient;
use crate::services::export::Exporter;
use crate::services::search_client::QueryClient;
use crate::services::search_controller::SearchController;
use crate::services::settings_engine::SettingsEngine;
use crate::types::errors::{AuthError, DataUnavailable, StartupError};
use crate::types::session::{Session, SessionSummary};
use crate::types::settings::{AppConfig, LocalStore};

/// Central application struct.
pub struct App {
    pub config: AppConfig,
    pub http: Client,
    pub repository: Option<Arc<dyn HistoryRepository>>,
    pub search: SearchController,
    pub auth: Option<AuthClient>,
    pub exporter: Exporter,
    /// Present when the configuration came from a settings file.
    pub settings: Option<Mutex<SettingsEngine>>,
    session: Mutex<Session>,
}

impl App {
    /// Builds the context from an already-resolved configuration.
    pub fn new(config: AppConfig) -> Result<Self, StartupError> {
        let http = Client::builder()
            .user_agent(concat!("research-assistant/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StartupError::Http(e.to_string()))?;

        let mut auth = None;
        let repository: Option<Arc<dyn HistoryRepository>> = match config.remote_store() {
            Some((url, key)) => {
                auth = Some(AuthClient::new(http.clone(), url, key));
                let repo: Arc<dyn HistoryRepository> = Arc::new(RestHistoryRepository::new(http.clone(), url, key));
                Some(repo)
            }
            None => match &config.history.local_store {
                LocalStore::Sqlite(path) => {
                    let repo: Arc<dyn HistoryRepository> = Arc::new(SqliteHistoryRepository::open(path)?);
                    Some(repo)
                }
                LocalStore::Memory => None,
            },
        };
        match &repository {
            Some(repo) => info!(store = repo.name(), "history store configured"),
            None => warn!("no history store configured, history is kept in memory only"),
        }

        let history = HistoryManager::new(repository.clone()).with_mirroring(config.history.mirror_enabled);
        let client = QueryClient::new(http.clone(), &config.backend.url)?
            .with_timeout_secs(config.backend.timeout_seconds);
        let search = SearchController::new(client, history, repository.clone());
        let exporter = Exporter::new(&config.export.output_dir, config.export.line_width);

        Ok(Self {
            config,
            http,
            repository,
            search,
            auth,
            exporter,
            settings: None,
            session: Mutex::new(Session::Anonymous),
        })
    }

    /// Builds the context from a loaded settings engine, applying
    /// environment overrides. The engine is kept for later updates.
    pub fn with_settings(engine: SettingsEngine) -> Result<Self, StartupError> {
        let mut app = Self::new(engine.effective())?;
        app.settings = Some(Mutex::new(engine));
        Ok(app)
    }

    pub fn history(&self) -> &HistoryManager {
        self.search.history()
    }

    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.lock_session().clone()
    }

    pub fn set_session(&self, session: Session) {
        *self.lock_session() = session;
    }

    /// Loads history for the current session.
    pub async fn startup(&self) -> Result<usize, DataUnavailable> {
        let session = self.session();
        self.history().load_history(&session).await
    }

    /// Signs in and loads the user's history. History failures are logged
    /// and do not fail the sign-in.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionSummary, AuthError> {
        let auth = self.auth.as_ref().ok_or(AuthError::NotConfigured)?;
        let session = auth.sign_in_with_password(email, password).await?;
        let summary = session.summary();
        self.set_session(session.clone());
        if let Err(e) = self.history().load_history(&session).await {
            warn!(error = %e, "history unavailable after sign-in");
        }
        Ok(summary)
    }

    /// Signs out, clearing local history and the results pane.
    pub async fn logout(&self) {
        let session = self.session();
        if let Some(auth) = &self.auth {
            if let Err(e) = auth.sign_out(&session).await {
                warn!(error = %e, "remote sign-out failed");
            }
        }
        self.set_session(Session::Anonymous);
        self.history().clear();
        self.search.reset();
    }
}
