//! DNSCrypt value types shared across layers.

use crate::errors::DomainError;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

pub const PUBLIC_KEY_LEN: usize = 32;
pub const SECRET_KEY_LEN: usize = 32;
pub const MAGIC_LEN: usize = 8;

/// Encryption system a certificate authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cipher {
    #[default]
    Undefined,
    XSalsa20Poly1305,
    XChaCha20Poly1305,
}

impl Cipher {
    /// Maps the certificate's encryption-system version (`es_version`).
    pub fn from_es_version(es_version: u16) -> Self {
        match es_version {
            1 => Self::XSalsa20Poly1305,
            2 => Self::XChaCha20Poly1305,
            _ => Self::Undefined,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::XSalsa20Poly1305 => "xsalsa20poly1305",
            Self::XChaCha20Poly1305 => "xchacha20poly1305",
        }
    }

    pub fn is_defined(&self) -> bool {
        !matches!(self, Self::Undefined)
    }
}

impl fmt::Display for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renders key bytes as uppercase hex in colon-separated 2-byte groups,
/// e.g. `2F01:B9D9:...`.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 5 / 2);
    for (i, pair) in bytes.chunks(2).enumerate() {
        if i > 0 {
            out.push(':');
        }
        out.push_str(&hex::encode_upper(pair));
    }
    out
}

/// Parses a 32-byte key written as hex, with or without `:` separators.
pub fn parse_public_key(text: &str) -> Result<[u8; PUBLIC_KEY_LEN], DomainError> {
    let compact: String = text
        .chars()
        .filter(|c| !matches!(c, ':' | ' ' | '\t'))
        .collect();
    let bytes = hex::decode(&compact)
        .map_err(|e| DomainError::InvalidKey(format!("'{}': {}", text, e)))?;
    bytes.try_into().map_err(|v: Vec<u8>| {
        DomainError::InvalidKey(format!(
            "'{}': expected {} bytes, got {}",
            text,
            PUBLIC_KEY_LEN,
            v.len()
        ))
    })
}

/// A configured upstream DNSCrypt provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsCryptProvider {
    /// Human readable name from the resolver list.
    pub name: String,
    /// Provider hostname the certificate TXT record is published under.
    pub provider_name: String,
    /// Long-term ed25519 key certificates must be signed with.
    pub signing_key: [u8; PUBLIC_KEY_LEN],
    pub address: SocketAddr,
    pub tcp_only: bool,
    pub dnssec: bool,
    pub no_logs: bool,
}

impl DnsCryptProvider {
    /// Arena key for the provider (`ip:port`).
    pub fn id(&self) -> String {
        self.address.to_string()
    }

    pub fn signing_key_fingerprint(&self) -> String {
        fingerprint(&self.signing_key)
    }
}

/// Transport used to reach an upstream endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportProtocol {
    #[default]
    Udp,
    Tcp,
}

impl TransportProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Udp => "UDP",
            Self::Tcp => "TCP",
        }
    }
}

impl FromStr for TransportProtocol {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "udp" => Ok(Self::Udp),
            "tcp" => Ok(Self::Tcp),
            other => Err(DomainError::ConfigError(format!(
                "Unknown transport protocol: {}",
                other
            ))),
        }
    }
}
