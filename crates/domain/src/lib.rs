//! Ferrous DNSCrypt Domain Layer
pub mod config;
pub mod dnscrypt;
pub mod errors;

pub use config::{CliOverrides, Config, ConfigError};
pub use dnscrypt::{Cipher, DnsCryptProvider, TransportProtocol};
pub use errors::{CryptError, DomainError};
