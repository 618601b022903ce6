use crate::dns::forwarding::CertificateTxtCodec;
use crate::dns::transport::{create_transport, TransportResponse};
use ferrous_dnscrypt_domain::{DnsCryptProvider, DomainError, TransportProtocol};
use std::time::Duration;
use tracing::debug;

const TC_FLAG: u8 = 0x02;

/// Sends the certificate TXT query to a provider and returns the raw
/// candidate blobs.
pub struct CertificateFetcher {
    timeout: Duration,
}

impl CertificateFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn fetch(&self, provider: &DnsCryptProvider) -> Result<Vec<Vec<u8>>, DomainError> {
        let (id, query) = CertificateTxtCodec::build_query(&provider.provider_name)?;

        let response = if provider.tcp_only {
            self.send(TransportProtocol::Tcp, provider, &query).await?
        } else {
            let response = self.send(TransportProtocol::Udp, provider, &query).await?;
            if is_truncated(&response.bytes) {
                debug!(
                    provider = %provider.address,
                    "Certificate response truncated, retrying over TCP"
                );
                self.send(TransportProtocol::Tcp, provider, &query).await?
            } else {
                response
            }
        };

        let bytes = response.bytes;
        if bytes.len() < 2 || u16::from_be_bytes([bytes[0], bytes[1]]) != id {
            return Err(DomainError::InvalidDnsResponse(format!(
                "Certificate response from {} does not match query id {}",
                provider.address, id
            )));
        }

        let candidates = CertificateTxtCodec::extract_certificates(&bytes)?;
        debug!(
            provider = %provider.address,
            protocol = response.protocol_used,
            candidates = candidates.len(),
            "Certificate candidates received"
        );
        Ok(candidates)
    }

    async fn send(
        &self,
        protocol: TransportProtocol,
        provider: &DnsCryptProvider,
        query: &[u8],
    ) -> Result<TransportResponse, DomainError> {
        create_transport(protocol, provider.address)
            .send(query, self.timeout)
            .await
    }
}

fn is_truncated(bytes: &[u8]) -> bool {
    bytes.len() > 2 && bytes[2] & TC_FLAG != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_truncated() {
        assert!(is_truncated(&[0, 0, 0x82, 0x80]));
        assert!(!is_truncated(&[0, 0, 0x81, 0x80]));
        assert!(!is_truncated(&[0, 0]));
    }
}
