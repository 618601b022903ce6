use async_trait::async_trait;
use ferrous_dnscrypt_domain::{Cipher, DomainError};

/// Summary of the certificate selected for a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledCertificate {
    pub serial: u32,
    pub version: u32,
    pub cipher: Cipher,
    pub ts_begin: u32,
    pub ts_end: u32,
}

/// Port driving certificate discovery for one provider at a time.
///
/// Providers are addressed by their arena id (`ip:port`), never by reference.
#[async_trait]
pub trait CertificateRefreshPort: Send + Sync {
    /// Ids of every configured provider.
    fn provider_ids(&self) -> Vec<String>;

    /// Sends the TXT certificate query and returns the raw candidate blobs.
    async fn fetch_certificates(&self, provider_id: &str) -> Result<Vec<Vec<u8>>, DomainError>;

    /// Picks the preferred valid candidate and installs it as the provider's
    /// active session.
    fn install_certificate(
        &self,
        provider_id: &str,
        candidates: &[Vec<u8>],
    ) -> Result<InstalledCertificate, DomainError>;
}
