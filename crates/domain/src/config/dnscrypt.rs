use super::errors::ConfigError;
use super::resolver_list::load_resolver_list;
use crate::dnscrypt::{fingerprint, parse_public_key, DnsCryptProvider};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

/// Port DNSCrypt providers listen on when the resolver list omits it.
pub const DEFAULT_PROVIDER_PORT: u16 = 443;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DnsCryptConfig {
    /// Derive a fresh keypair for every query instead of using a fixed
    /// client identity.
    #[serde(default = "default_true")]
    pub ephemeral_keys: bool,

    #[serde(default)]
    pub client_public_key_file: Option<String>,

    #[serde(default)]
    pub client_secret_key_file: Option<String>,

    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Where the status job writes the currently ready providers.
    #[serde(default)]
    pub ready_providers_file: Option<String>,

    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,

    /// CSV resolver list (`dnscrypt-resolvers.csv` layout), loaded in
    /// addition to `providers`.
    #[serde(default)]
    pub resolvers_file: Option<String>,

    #[serde(default)]
    pub providers: Vec<ProviderEntry>,

    /// Present when this instance also serves DNSCrypt to downstream clients.
    #[serde(default)]
    pub server: Option<DnsCryptServerConfig>,
}

impl Default for DnsCryptConfig {
    fn default() -> Self {
        Self {
            ephemeral_keys: true,
            client_public_key_file: None,
            client_secret_key_file: None,
            query_timeout_ms: default_query_timeout_ms(),
            ready_providers_file: None,
            status_interval_secs: default_status_interval_secs(),
            resolvers_file: None,
            providers: Vec::new(),
            server: None,
        }
    }
}

impl DnsCryptConfig {
    /// Inline `[[dnscrypt.providers]]` first, then the rows of `resolvers_file`.
    pub fn resolve_providers(&self) -> Result<Vec<DnsCryptProvider>, ConfigError> {
        let mut providers = self
            .providers
            .iter()
            .map(ProviderEntry::to_provider)
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(path) = &self.resolvers_file {
            providers.extend(load_resolver_list(path)?);
        }
        Ok(providers)
    }

    pub fn has_providers(&self) -> bool {
        !self.providers.is_empty() || self.resolvers_file.is_some()
    }
}

/// One row of the resolver list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProviderEntry {
    pub name: String,

    pub provider_name: String,

    /// Hex fingerprint of the provider's signing key.
    pub public_key: String,

    /// `ip[:port]`, port defaults to 443.
    pub address: String,

    #[serde(default)]
    pub tcp_only: bool,

    #[serde(default)]
    pub dnssec: bool,

    #[serde(default)]
    pub no_logs: bool,
}

impl ProviderEntry {
    pub fn to_provider(&self) -> Result<DnsCryptProvider, ConfigError> {
        if self.provider_name.trim().is_empty() {
            return Err(ConfigError::Provider(
                self.name.clone(),
                "empty provider name".to_string(),
            ));
        }
        let signing_key = parse_public_key(&self.public_key)
            .map_err(|e| ConfigError::Provider(self.name.clone(), e.to_string()))?;
        let address = parse_provider_address(&self.address).ok_or_else(|| {
            ConfigError::Provider(self.name.clone(), format!("bad address '{}'", self.address))
        })?;

        Ok(DnsCryptProvider {
            name: self.name.clone(),
            provider_name: self.provider_name.clone(),
            signing_key,
            address,
            tcp_only: self.tcp_only,
            dnssec: self.dnssec,
            no_logs: self.no_logs,
        })
    }
}

impl From<&DnsCryptProvider> for ProviderEntry {
    fn from(provider: &DnsCryptProvider) -> Self {
        Self {
            name: provider.name.clone(),
            provider_name: provider.provider_name.clone(),
            public_key: fingerprint(&provider.signing_key),
            address: provider.address.to_string(),
            tcp_only: provider.tcp_only,
            dnssec: provider.dnssec,
            no_logs: provider.no_logs,
        }
    }
}

/// Key material and certificate for serving DNSCrypt.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DnsCryptServerConfig {
    /// Hostname clients query (TXT) to obtain the certificate.
    pub provider_name: String,

    pub public_key_file: String,

    pub secret_key_file: String,

    pub certificate_file: String,
}

pub fn parse_provider_address(text: &str) -> Option<SocketAddr> {
    let text = text.trim();
    if let Ok(addr) = text.parse::<SocketAddr>() {
        return Some(addr);
    }
    let host = text.trim_start_matches('[').trim_end_matches(']');
    host.parse::<IpAddr>()
        .ok()
        .map(|ip| SocketAddr::new(ip, DEFAULT_PROVIDER_PORT))
}

fn default_true() -> bool {
    true
}

fn default_query_timeout_ms() -> u64 {
    5000
}

fn default_status_interval_secs() -> u64 {
    7 * 60
}
