//! Configuration loading and persistence.

use super::Config;
use crate::env;
use crate::error::ConfigError;
use crate::paths;
use std::fs;
use std::path::Path;
use tracing::debug;

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = paths::config_file()?;
        Self::load(&path)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        debug!(path = %path.display(), "loading config");
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Load from `path` (or the default path), falling back to defaults when
    /// no file exists, then apply `KEYFOLDER_*` environment overrides.
    ///
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let loaded = match path {
            Some(p) => Self::load(p),
            None => Self::load_default(),
        };
        let mut config = match loaded {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => Self::default_with_folder(),
            Err(e) => return Err(e),
        };
        config.apply_env();
        Ok(config)
    }

    /// Defaults with the folder populated (serde defaults do not apply to `Default`).
    pub fn default_with_folder() -> Self {
        Self {
            app_folder: super::DEFAULT_APP_FOLDER.to_string(),
            ..Self::default()
        }
    }

    /// Overlay environment variable overrides onto this configuration.
    pub fn apply_env(&mut self) {
        if let Some(folder) = env::get_var(env::vars::KEYFOLDER_APP_FOLDER) {
            self.app_folder = folder;
        }
        if let Some(address) = env::get_var(env::vars::KEYFOLDER_BUS_ADDRESS) {
            self.bus.address = Some(address);
        }
        if let Some(secs) = env::get_u64(env::vars::KEYFOLDER_PROMPT_TIMEOUT_SECS) {
            self.unlock.prompt_timeout_secs = Some(secs);
        }
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Serialize to JSON5 string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // json5 has no serializer; plain JSON is valid JSON5
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.app_folder.trim().is_empty() {
            errors.push("app_folder must not be empty".to_string());
        }

        if let Some(address) = &self.bus.address {
            if address.trim().is_empty() {
                errors.push("bus.address must not be empty when set".to_string());
            } else if !address.contains(':') {
                errors.push(format!(
                    "bus.address '{}' is not a D-Bus address (expected 'transport:key=value')",
                    address
                ));
            }
        }

        if self.unlock.prompt_timeout_secs == Some(0) {
            errors.push("unlock.prompt_timeout_secs must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}
