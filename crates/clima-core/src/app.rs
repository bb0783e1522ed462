use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::config::{Config, ValidationResult};

/// Application state and lifecycle manager
pub struct App {
    config: Arc<Config>,
    validation: ValidationResult,
}

impl App {
    /// Create a new application instance from the default config location,
    /// or from `config_path` when given.
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let (config, validation) = Config::load_validated(config_path)?;
        Ok(Self::with_config(config, validation))
    }

    /// Create an application around an already-loaded config
    pub fn with_config(config: Config, validation: ValidationResult) -> Self {
        Self {
            config: Arc::new(config),
            validation,
        }
    }

    /// Shutdown the application
    pub fn shutdown(&mut self) -> Result<()> {
        tracing::info!("Shutting down application");
        Ok(())
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle to the config for long-lived services
    pub fn shared_config(&self) -> Arc<Config> {
        self.config.clone()
    }

    /// Warnings collected while validating the config
    pub fn warnings(&self) -> &[crate::config::ConfigValidationError] {
        &self.validation.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::default().save_to(&path).unwrap();

        let app = App::new(Some(&path)).unwrap();
        assert_eq!(app.config().weather.country_code, "BR");
    }

    #[test]
    fn test_app_hands_back_warnings() {
        let mut config = Config::default();
        config.weather.api_key = String::new();
        let validation = config.validate();

        let app = App::with_config(config, validation);
        assert!(app.warnings().iter().any(|w| w.field == "weather.api_key"));
    }

    #[test]
    fn test_app_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[registry]\nbase_url = \"nope\"\n").unwrap();

        assert!(App::new(Some(&path)).is_err());
    }
}
