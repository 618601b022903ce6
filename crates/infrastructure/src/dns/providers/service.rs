use super::fetcher::CertificateFetcher;
use super::registry::ProviderRegistry;
use crate::dns::dnscrypt::unix_now;
use async_trait::async_trait;
use ferrous_dnscrypt_application::ports::{
    CertificateRefreshPort, InstalledCertificate, ProviderStatus, ProviderStatusPort,
};
use ferrous_dnscrypt_domain::DomainError;
use std::sync::Arc;
use std::time::Duration;

/// Binds the provider arena to the certificate fetcher for the refresh and
/// status jobs.
pub struct ProviderCertificateService {
    registry: Arc<ProviderRegistry>,
    fetcher: CertificateFetcher,
}

impl ProviderCertificateService {
    pub fn new(registry: Arc<ProviderRegistry>, query_timeout: Duration) -> Self {
        Self {
            registry,
            fetcher: CertificateFetcher::new(query_timeout),
        }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }
}

#[async_trait]
impl CertificateRefreshPort for ProviderCertificateService {
    fn provider_ids(&self) -> Vec<String> {
        self.registry.ids()
    }

    async fn fetch_certificates(&self, provider_id: &str) -> Result<Vec<Vec<u8>>, DomainError> {
        let slot = self
            .registry
            .get(provider_id)
            .ok_or_else(|| DomainError::ProviderNotFound(provider_id.to_string()))?;
        self.fetcher.fetch(slot.provider()).await
    }

    fn install_certificate(
        &self,
        provider_id: &str,
        candidates: &[Vec<u8>],
    ) -> Result<InstalledCertificate, DomainError> {
        let ready = self
            .registry
            .install_certificate(provider_id, candidates, unix_now())?;
        let cert = &ready.certificate;
        Ok(InstalledCertificate {
            serial: cert.serial(),
            version: cert.version().packed(),
            cipher: cert.cipher(),
            ts_begin: cert.ts_begin(),
            ts_end: cert.ts_end(),
        })
    }
}

impl ProviderStatusPort for ProviderCertificateService {
    fn status(&self) -> ProviderStatus {
        ProviderStatus {
            total: self.registry.len(),
            ready: self.registry.ready_count(),
        }
    }

    fn save_ready_providers(&self, path: &str) -> Result<usize, DomainError> {
        self.registry.save_ready_providers(path)
    }
}
