use ferrous_dnscrypt_domain::DomainError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProviderStatus {
    pub total: usize,
    pub ready: usize,
}

/// Port for reporting and persisting which DNSCrypt providers are usable.
pub trait ProviderStatusPort: Send + Sync {
    fn status(&self) -> ProviderStatus;

    /// Writes the ready providers to `path`, returning how many were written.
    fn save_ready_providers(&self, path: &str) -> Result<usize, DomainError>;
}
