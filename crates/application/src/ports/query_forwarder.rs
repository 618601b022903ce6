use async_trait::async_trait;
use ferrous_dnscrypt_domain::DomainError;

/// Forwards a plaintext DNS message upstream and returns the plaintext reply.
#[async_trait]
pub trait QueryForwarder: Send + Sync {
    async fn forward(&self, query: &[u8]) -> Result<Vec<u8>, DomainError>;

    fn name(&self) -> &'static str;
}
