use std::path::PathBuf;

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    pub debug: bool,
    /// JSON snapshot backing the store; unset keeps events in memory only.
    pub data_file: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            // APP_DEBUG, APP_DATA_FILE
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("debug", false)?
            .build()?;

        config.try_deserialize()
    }

    pub fn log_filter(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    fn clear_env() {
        // SAFETY: serialized with every other test that touches APP_* variables.
        unsafe {
            std::env::remove_var("APP_DEBUG");
            std::env::remove_var("APP_DATA_FILE");
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let settings = Settings::from_env().unwrap();
        assert!(!settings.debug);
        assert!(settings.data_file.is_none());
        assert_eq!(settings.log_filter(), "info");
    }

    #[test]
    #[serial]
    fn test_reads_environment() {
        clear_env();
        unsafe {
            std::env::set_var("APP_DEBUG", "true");
            std::env::set_var("APP_DATA_FILE", "/tmp/class-events.json");
        }
        let settings = Settings::from_env().unwrap();
        clear_env();

        assert!(settings.debug);
        assert_eq!(
            settings.data_file,
            Some(PathBuf::from("/tmp/class-events.json"))
        );
        assert_eq!(settings.log_filter(), "debug");
    }
}
