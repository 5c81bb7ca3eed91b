// Research Assistant Settings Engine
// Loads, saves, updates and resets the application configuration.
// The configuration is a JSON file at the platform config path; environment
// variables override the store and backend endpoints at runtime without being
// written back to disk.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::AppConfig;

/// Overrides `backend.url`.
pub const ENV_BACKEND_URL: &str = "RESEARCH_BACKEND_URL";
/// Overrides `store.url`.
pub const ENV_STORE_URL: &str = "SUPABASE_URL";
/// Overrides `store.anon_key`.
pub const ENV_STORE_ANON_KEY: &str = "SUPABASE_ANON_KEY";

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<AppConfig, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &AppConfig;
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &str;
}

/// Applies environment overrides using `var` as the lookup. Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut AppConfig, var: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());
    if let Some(url) = non_empty(ENV_BACKEND_URL) {
        config.backend.url = url;
    }
    if let Some(url) = non_empty(ENV_STORE_URL) {
        config.store.url = Some(url);
    }
    if let Some(key) = non_empty(ENV_STORE_ANON_KEY) {
        config.store.anon_key = Some(key);
    }
}

/// Checks values that deserialize fine but make no sense.
pub fn validate(config: &AppConfig) -> Result<(), SettingsError> {
    url::Url::parse(&config.backend.url)
        .map_err(|e| SettingsError::InvalidValue(format!("backend.url: {}", e)))?;
    if let Some(store) = config.store.url.as_deref() {
        url::Url::parse(store).map_err(|e| SettingsError::InvalidValue(format!("store.url: {}", e)))?;
    }
    if config.export.line_width < 20 {
        return Err(SettingsError::InvalidValue(
            "export.line_width must be at least 20".to_string(),
        ));
    }
    if config.logging.filter.trim().is_empty() {
        return Err(SettingsError::InvalidValue("logging.filter cannot be empty".to_string()));
    }
    Ok(())
}

/// Settings engine that persists the configuration as JSON on disk.
pub struct SettingsEngine {
    config_path: String,
    settings: AppConfig,
}

impl SettingsEngine {
    /// Creates a new SettingsEngine.
    ///
    /// If `path_override` is `Some`, uses that path for the config file.
    /// Otherwise, uses `settings.json` in the platform config directory.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = path_override.unwrap_or_else(|| {
            platform::get_config_dir()
                .join("settings.json")
                .to_string_lossy()
                .to_string()
        });

        Self {
            config_path,
            settings: AppConfig::default(),
        }
    }

    /// The stored configuration with process environment overrides applied.
    pub fn effective(&self) -> AppConfig {
        let mut config = self.settings.clone();
        apply_env_overrides(&mut config, |name| std::env::var(name).ok());
        config
    }
}

impl SettingsEngineTrait for SettingsEngine {
    /// Loads the configuration file. A missing file yields defaults; a
    /// malformed one is a serialization error.
    fn load(&mut self) -> Result<AppConfig, SettingsError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            debug!(path = %self.config_path, "no config file, using defaults");
            self.settings = AppConfig::default();
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::IoError(format!("Failed to read config file: {}", e)))?;

        let settings: AppConfig = serde_json::from_str(&content).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;
        validate(&settings)?;

        info!(path = %self.config_path, "loaded configuration");
        self.settings = settings;
        Ok(self.settings.clone())
    }

    fn save(&self) -> Result<(), SettingsError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write config file: {}", e)))
    }

    fn get_settings(&self) -> &AppConfig {
        &self.settings
    }

    /// Updates one value by dot-notation key path, e.g. `backend.url` or
    /// `export.line_width`, validates the result and saves it.
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError> {
        if key.is_empty() {
            return Err(SettingsError::InvalidKey("Key cannot be empty".to_string()));
        }
        let parts: Vec<&str> = key.split('.').collect();

        let mut json_value = serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        let (last, path) = match parts.split_last() {
            Some(split) => split,
            None => return Err(SettingsError::InvalidKey("Key cannot be empty".to_string())),
        };
        let mut current = &mut json_value;
        for part in path {
            current = current
                .get_mut(*part)
                .ok_or_else(|| SettingsError::InvalidKey(format!("Key '{}' not found in settings", key)))?;
        }
        match current {
            serde_json::Value::Object(map) if map.contains_key(*last) => {
                map.insert(last.to_string(), value);
            }
            serde_json::Value::Object(_) => {
                return Err(SettingsError::InvalidKey(format!("Key '{}' not found in settings", key)));
            }
            _ => {
                return Err(SettingsError::InvalidKey(format!(
                    "Cannot navigate to key '{}': intermediate value is not an object",
                    key
                )));
            }
        }

        let updated: AppConfig = serde_json::from_value(json_value).map_err(|e| {
            SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;
        validate(&updated)?;

        self.settings = updated;
        self.save()?;
        info!(key, "setting updated");
        Ok(())
    }

    fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = AppConfig::default();
        self.save()
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}
