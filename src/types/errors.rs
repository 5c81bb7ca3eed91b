use thiserror::Error;

// === RepositoryError ===

/// Failure kinds reported by a history repository, independent of the
/// backing store's own error vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// The `search_history` table does not exist yet.
    #[error("Search history table missing: {0}")]
    TableMissing(String),
    /// The store rejected the request for the current credentials.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// A row addressed by id or query was not found.
    #[error("Row not found: {0}")]
    NotFound(String),
    /// The store could not be reached or returned an unexpected failure.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// The store answered but the payload could not be decoded.
    #[error("Malformed store response: {0}")]
    Decode(String),
}

// === DataUnavailable ===

/// Why the history list could not be loaded. Each variant maps to a distinct
/// user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataUnavailable {
    /// The remote table is missing and must be created first.
    #[error("Search history is not set up yet. Create the search_history table and reload.")]
    SetupRequired,
    /// The signed-in user may not read the table.
    #[error("Permission denied while reading search history. Check the table's access policies.")]
    PermissionDenied,
    /// Generic connectivity or store failure.
    #[error("Could not load search history: {0}")]
    Connectivity(String),
}

impl DataUnavailable {
    /// Short machine-readable tag for the condition.
    pub fn tag(&self) -> &'static str {
        match self {
            DataUnavailable::SetupRequired => "setup_required",
            DataUnavailable::PermissionDenied => "permission_denied",
            DataUnavailable::Connectivity(_) => "connectivity",
        }
    }
}

impl From<RepositoryError> for DataUnavailable {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::TableMissing(_) => DataUnavailable::SetupRequired,
            RepositoryError::PermissionDenied(_) => DataUnavailable::PermissionDenied,
            other => DataUnavailable::Connectivity(other.to_string()),
        }
    }
}

// === DeleteError ===

/// Errors surfaced to the user when deleting a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeleteError {
    /// Both the id-keyed and the query-keyed deletion failed.
    #[error("Failed to delete item. Please try again. ({0})")]
    DeleteFailed(String),
}

// === SearchError ===

/// Errors related to submitting a search.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// The query was empty or whitespace only.
    #[error("Search query is empty")]
    EmptyQuery,
    /// Another search is still in flight.
    #[error("A search is already in progress")]
    Busy,
    /// The query endpoint could not be reached or the stream broke.
    #[error("Search request failed: {0}")]
    Network(String),
    /// The configured backend URL is unusable.
    #[error("Invalid backend URL: {0}")]
    InvalidEndpoint(String),
}

// === AuthError ===

/// Errors related to signing in and out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No remote store credentials are configured.
    #[error("Authentication is not configured")]
    NotConfigured,
    /// The provider rejected the credentials.
    #[error("Sign-in rejected: {0}")]
    Rejected(String),
    /// The provider could not be reached.
    #[error("Authentication request failed: {0}")]
    Network(String),
}

// === ExportError ===

/// Errors related to summary export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The summary could not be laid out into pages.
    #[error("Layout failed: {0}")]
    Layout(String),
    /// Writing the output file failed.
    #[error("Export write failed: {0}")]
    Io(#[from] std::io::Error),
}

// === SettingsError ===

/// Errors related to configuration loading and updates.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Reading or writing the config file failed.
    #[error("Settings I/O error: {0}")]
    IoError(String),
    /// The config file or a value could not be (de)serialized.
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    /// The dot-notation key does not exist.
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    /// The value has the wrong type or fails validation.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}

// === StartupError ===

/// Errors raised while assembling the application context.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error("Could not open local history store: {0}")]
    Store(#[from] RepositoryError),
    #[error("Could not build HTTP client: {0}")]
    Http(String),
}
