use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("Invalid DNS response: {0}")]
    InvalidDnsResponse(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Query timeout")]
    QueryTimeout,

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Transport timeout connecting to {server}")]
    TransportTimeout { server: String },

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("No DNSCrypt provider is ready")]
    NoReadyProvider,

    #[error("No upstream servers configured")]
    NoUpstreamServers,

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Crypt(#[from] CryptError),
}

/// Failures of the DNSCrypt secure channel.
///
/// Certificate errors are scoped to one candidate and envelope errors to
/// one message; neither is fatal to the process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptError {
    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),

    #[error("No usable certificate among {0} candidates")]
    NoValidCertificate(usize),

    #[error("Certificate cipher is undefined")]
    UndefinedCipher,

    #[error("Suspicious public key")]
    SuspiciousPublicKey,

    #[error("Crypt failure: {0}")]
    CryptFailure(String),

    #[error("Message of {len} bytes exceeds the {max} bytes an envelope can carry")]
    MessageTooLarge { len: usize, max: usize },
}

impl CryptError {
    pub fn invalid_certificate(reason: impl Into<String>) -> Self {
        Self::InvalidCertificate(reason.into())
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::CryptFailure(reason.into())
    }
}
