use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::dnscrypt::{DnsCryptConfig, DnsCryptServerConfig};
use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::server::ServerConfig;
use super::upstream::UpstreamConfig;

/// Main configuration structure for Ferrous DNSCrypt
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Listener configuration (bind address, port, workers)
    #[serde(default)]
    pub server: ServerConfig,

    /// Plain DNS upstreams
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// DNSCrypt providers and serving keys
    #[serde(default)]
    pub dnscrypt: DnsCryptConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. ferrous-dnscrypt.toml in current directory
    /// 3. /etc/ferrous-dnscrypt/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if let Some(found) = Self::get_config_path() {
            Self::from_file(&found)?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides)?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) -> Result<(), ConfigError> {
        if let Some(port) = overrides.dns_port {
            self.server.dns_port = port;
        }
        if let Some(bind) = overrides.bind_address {
            self.server.bind_address = bind;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }

        let server_keys = [
            &overrides.server_name,
            &overrides.server_public_key_file,
            &overrides.server_secret_key_file,
            &overrides.server_certificate_file,
        ];
        if server_keys.iter().all(|o| o.is_none()) {
            return Ok(());
        }

        let existing = self.dnscrypt.server.take();
        let pick = |cli: Option<String>, current: Option<&String>, what: &str| {
            cli.or_else(|| current.cloned()).ok_or_else(|| {
                ConfigError::Validation(format!("DNSCrypt serving requires {}", what))
            })
        };
        let server = DnsCryptServerConfig {
            provider_name: pick(
                overrides.server_name,
                existing.as_ref().map(|s| &s.provider_name),
                "a server name",
            )?,
            public_key_file: pick(
                overrides.server_public_key_file,
                existing.as_ref().map(|s| &s.public_key_file),
                "a public key file",
            )?,
            secret_key_file: pick(
                overrides.server_secret_key_file,
                existing.as_ref().map(|s| &s.secret_key_file),
                "a secret key file",
            )?,
            certificate_file: pick(
                overrides.server_certificate_file,
                existing.as_ref().map(|s| &s.certificate_file),
                "a certificate file",
            )?,
        };
        self.dnscrypt.server = Some(server);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.dns_port == 0 {
            return Err(ConfigError::Validation("DNS port cannot be 0".to_string()));
        }

        self.logging.validate()?;

        if self.server.num_workers == 0 {
            return Err(ConfigError::Validation(
                "At least one worker is required".to_string(),
            ));
        }

        if self.upstream.servers.is_empty() && !self.dnscrypt.has_providers() {
            return Err(ConfigError::Validation(
                "No upstream servers or DNSCrypt providers configured".to_string(),
            ));
        }

        for server in &self.upstream.servers {
            if server.parse::<std::net::SocketAddr>().is_err() {
                return Err(ConfigError::Validation(format!(
                    "Invalid upstream server address '{}'",
                    server
                )));
            }
        }

        if !matches!(
            self.upstream.protocol.to_ascii_lowercase().as_str(),
            "udp" | "tcp"
        ) {
            return Err(ConfigError::Validation(format!(
                "Unknown upstream protocol '{}'",
                self.upstream.protocol
            )));
        }

        let mut seen = HashSet::new();
        for provider in self.dnscrypt.resolve_providers()? {
            if !seen.insert(provider.id()) {
                return Err(ConfigError::Provider(
                    provider.name,
                    format!("duplicate address {}", provider.address),
                ));
            }
        }

        if self.dnscrypt.client_public_key_file.is_some()
            != self.dnscrypt.client_secret_key_file.is_some()
        {
            return Err(ConfigError::Validation(
                "Client public and secret key files must be set together".to_string(),
            ));
        }

        if let Some(server) = &self.dnscrypt.server {
            if server.provider_name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "DNSCrypt server name cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, toml_string)
            .map_err(|e| ConfigError::FileWrite(path.to_string(), e.to_string()))?;
        Ok(())
    }

    /// Get the path to the configuration file being used
    pub fn get_config_path() -> Option<String> {
        if std::path::Path::new("ferrous-dnscrypt.toml").exists() {
            Some("ferrous-dnscrypt.toml".to_string())
        } else if std::path::Path::new("/etc/ferrous-dnscrypt/config.toml").exists() {
            Some("/etc/ferrous-dnscrypt/config.toml".to_string())
        } else {
            None
        }
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub dns_port: Option<u16>,
    pub bind_address: Option<String>,
    pub log_level: Option<String>,
    pub server_name: Option<String>,
    pub server_public_key_file: Option<String>,
    pub server_secret_key_file: Option<String>,
    pub server_certificate_file: Option<String>,
}
