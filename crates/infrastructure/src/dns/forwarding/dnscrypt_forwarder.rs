use crate::dns::dnscrypt::RESPONSE_MAGIC;
use crate::dns::providers::ProviderRegistry;
use crate::dns::transport::create_transport;
use async_trait::async_trait;
use ferrous_dnscrypt_application::ports::QueryForwarder;
use ferrous_dnscrypt_domain::{DomainError, TransportProtocol};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Forwards plaintext queries through a random ready DNSCrypt provider.
pub struct DnsCryptForwarder {
    registry: Arc<ProviderRegistry>,
    timeout: Duration,
}

impl DnsCryptForwarder {
    pub fn new(registry: Arc<ProviderRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }
}

/// A provider that cannot fit its encrypted answer in a datagram replies
/// with a plaintext header carrying TC.
fn is_plain_truncated(bytes: &[u8]) -> bool {
    bytes.len() >= 12
        && bytes[..RESPONSE_MAGIC.len()] != RESPONSE_MAGIC
        && bytes[2] & 0x02 != 0
}

#[async_trait]
impl QueryForwarder for DnsCryptForwarder {
    async fn forward(&self, query: &[u8]) -> Result<Vec<u8>, DomainError> {
        let (slot, ready) = self
            .registry
            .select_random_ready()
            .ok_or(DomainError::NoReadyProvider)?;
        let provider = slot.provider();

        let mut protocol = if provider.tcp_only {
            TransportProtocol::Tcp
        } else {
            TransportProtocol::Udp
        };

        loop {
            let (nonce, envelope) = ready.session.encrypt(query)?;
            let response = create_transport(protocol, provider.address)
                .send(&envelope, self.timeout)
                .await?;

            if protocol == TransportProtocol::Udp && is_plain_truncated(&response.bytes) {
                debug!(
                    provider = %provider.address,
                    "Truncated DNSCrypt answer, retrying over TCP"
                );
                protocol = TransportProtocol::Tcp;
                continue;
            }

            return ready
                .session
                .decrypt(&nonce, &response.bytes)
                .map_err(|e| {
                    warn!(
                        provider = %provider.address,
                        error = %e,
                        "Failed to open DNSCrypt response"
                    );
                    DomainError::from(e)
                });
        }
    }

    fn name(&self) -> &'static str {
        "dnscrypt"
    }
}
