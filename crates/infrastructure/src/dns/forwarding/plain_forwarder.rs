use crate::dns::transport::create_transport;
use async_trait::async_trait;
use ferrous_dnscrypt_application::ports::QueryForwarder;
use ferrous_dnscrypt_domain::{DomainError, TransportProtocol};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, warn};

/// Forwards plaintext queries to conventional upstream resolvers, starting
/// at a random server and failing over in order.
pub struct PlainForwarder {
    servers: Vec<SocketAddr>,
    protocol: TransportProtocol,
    timeout: Duration,
}

impl PlainForwarder {
    pub fn new(servers: Vec<SocketAddr>, protocol: TransportProtocol, timeout: Duration) -> Self {
        Self {
            servers,
            protocol,
            timeout,
        }
    }

    pub fn from_config(
        config: &ferrous_dnscrypt_domain::config::UpstreamConfig,
    ) -> Result<Self, DomainError> {
        let servers = config
            .servers
            .iter()
            .map(|s| {
                s.parse::<SocketAddr>().map_err(|e| {
                    DomainError::ConfigError(format!("Invalid upstream '{}': {}", s, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let protocol = config.protocol.parse::<TransportProtocol>()?;
        Ok(Self::new(
            servers,
            protocol,
            Duration::from_millis(config.query_timeout_ms),
        ))
    }

    async fn query_server(
        &self,
        server: SocketAddr,
        query: &[u8],
    ) -> Result<Vec<u8>, DomainError> {
        let response = create_transport(self.protocol, server)
            .send(query, self.timeout)
            .await?;
        let truncated = response.bytes.len() > 2 && response.bytes[2] & 0x02 != 0;
        if self.protocol == TransportProtocol::Udp && truncated {
            debug!(server = %server, "Truncated answer, retrying over TCP");
            let retry = create_transport(TransportProtocol::Tcp, server)
                .send(query, self.timeout)
                .await?;
            return Ok(retry.bytes);
        }
        Ok(response.bytes)
    }
}

#[async_trait]
impl QueryForwarder for PlainForwarder {
    async fn forward(&self, query: &[u8]) -> Result<Vec<u8>, DomainError> {
        if self.servers.is_empty() {
            return Err(DomainError::NoUpstreamServers);
        }

        let start = fastrand::usize(..self.servers.len());
        let mut last_error = DomainError::NoUpstreamServers;
        for offset in 0..self.servers.len() {
            let server = self.servers[(start + offset) % self.servers.len()];
            match self.query_server(server, query).await {
                Ok(reply) => return Ok(reply),
                Err(e) => {
                    warn!(server = %server, error = %e, "Upstream query failed");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    fn name(&self) -> &'static str {
        "plain"
    }
}
