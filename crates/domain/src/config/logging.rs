use super::errors::ConfigError;
use serde::{Deserialize, Serialize};

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Accepts a bare level or an `EnvFilter` directive list
    /// (`info,ferrous_dnscrypt_jobs=debug`).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bare = self.level.to_ascii_lowercase();
        if LEVELS.contains(&bare.as_str()) || self.level.contains('=') {
            Ok(())
        } else {
            Err(ConfigError::Validation(format!(
                "Unknown log level '{}' (expected one of {})",
                self.level,
                LEVELS.join(", ")
            )))
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
