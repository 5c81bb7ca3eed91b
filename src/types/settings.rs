use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub backend: BackendSettings,
    pub store: StoreSettings,
    pub history: HistorySettings,
    pub export: ExportSettings,
    pub logging: LoggingSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendSettings::default(),
            store: StoreSettings::default(),
            history: HistorySettings::default(),
            export: ExportSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl AppConfig {
    /// Remote persistence is active only when both store credentials are set.
    pub fn remote_store(&self) -> Option<(&str, &str)> {
        match (self.store.url.as_deref(), self.store.anon_key.as_deref()) {
            (Some(url), Some(key)) if !url.trim().is_empty() && !key.trim().is_empty() => {
                Some((url, key))
            }
            _ => None,
        }
    }
}

/// Query endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendSettings {
    pub url: String,
    /// Request timeout in seconds; 0 disables the timeout.
    #[serde(default)]
    pub timeout_seconds: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            timeout_seconds: 0,
        }
    }
}

/// Hosted auth/database credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StoreSettings {
    pub url: Option<String>,
    pub anon_key: Option<String>,
}

/// Where history lives when no remote store is configured.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum LocalStore {
    /// Keep history in memory only.
    Memory,
    /// Persist history to a SQLite file at the given path.
    Sqlite(String),
}

/// History behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistorySettings {
    pub local_store: LocalStore,
    /// Skip remote mirroring while keeping local history.
    pub mirror_enabled: bool,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            local_store: LocalStore::Memory,
            mirror_enabled: true,
        }
    }
}

/// Summary export settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportSettings {
    pub output_dir: String,
    /// Characters per laid-out line.
    pub line_width: usize,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: ".".to_string(),
            line_width: 90,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}
