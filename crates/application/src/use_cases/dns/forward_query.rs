use crate::ports::QueryForwarder;
use ferrous_dnscrypt_domain::DomainError;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

const DNS_HEADER_LEN: usize = 12;

/// Routes a plaintext query through a ready DNSCrypt provider, falling back
/// to plain upstreams only when no provider is ready.
pub struct ForwardQueryUseCase {
    encrypted: Option<Arc<dyn QueryForwarder>>,
    plain: Option<Arc<dyn QueryForwarder>>,
}

impl ForwardQueryUseCase {
    pub fn new() -> Self {
        Self {
            encrypted: None,
            plain: None,
        }
    }

    pub fn with_encrypted(mut self, forwarder: Arc<dyn QueryForwarder>) -> Self {
        self.encrypted = Some(forwarder);
        self
    }

    pub fn with_plain(mut self, forwarder: Arc<dyn QueryForwarder>) -> Self {
        self.plain = Some(forwarder);
        self
    }

    pub async fn execute(&self, query: &[u8]) -> Result<Vec<u8>, DomainError> {
        if query.len() < DNS_HEADER_LEN {
            return Err(DomainError::InvalidDnsResponse(format!(
                "query of {} bytes is shorter than a DNS header",
                query.len()
            )));
        }

        let start = Instant::now();

        if let Some(encrypted) = &self.encrypted {
            match encrypted.forward(query).await {
                Ok(reply) => {
                    debug!(
                        via = encrypted.name(),
                        bytes = reply.len(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Query forwarded"
                    );
                    return Ok(reply);
                }
                Err(DomainError::NoReadyProvider) if self.plain.is_some() => {
                    debug!("No DNSCrypt provider ready, using plain upstream");
                }
                Err(e) => return Err(e),
            }
        }

        let plain = self.plain.as_ref().ok_or(DomainError::NoUpstreamServers)?;
        let reply = plain.forward(query).await?;
        debug!(
            via = plain.name(),
            bytes = reply.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Query forwarded"
        );
        Ok(reply)
    }
}

impl Default for ForwardQueryUseCase {
    fn default() -> Self {
        Self::new()
    }
}
