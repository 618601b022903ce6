#![allow(dead_code)]
use ferrous_dnscrypt_infrastructure::dns::transport::tcp::{
    read_with_length_prefix, send_with_length_prefix,
};
use ferrous_dnscrypt_infrastructure::dns::DnsCryptResponder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::oneshot;

/// A DNSCrypt provider on loopback, serving UDP and TCP on the same port.
pub struct MockDnsCryptServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockDnsCryptServer {
    pub async fn start(responder: Arc<DnsCryptResponder>) -> Result<Self, std::io::Error> {
        Self::start_with(responder, false).await
    }

    /// Replies to every UDP query with a bare TC header, forcing TCP.
    pub async fn start_truncating(
        responder: Arc<DnsCryptResponder>,
    ) -> Result<Self, std::io::Error> {
        Self::start_with(responder, true).await
    }

    async fn start_with(
        responder: Arc<DnsCryptResponder>,
        truncate_udp: bool,
    ) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;
        let socket = UdpSocket::bind(addr).await?;

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 65_535];

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        break;
                    }
                    result = socket.recv_from(&mut buf) => {
                        if let Ok((len, peer)) = result {
                            let reply = if truncate_udp && len >= 12 {
                                Some(Self::truncated_header(&buf[..len]))
                            } else {
                                responder.handle(&buf[..len]).await
                            };
                            if let Some(reply) = reply {
                                let _ = socket.send_to(&reply, peer).await;
                            }
                        }
                    }
                    accepted = listener.accept() => {
                        if let Ok((mut stream, _)) = accepted {
                            let responder = Arc::clone(&responder);
                            tokio::spawn(async move {
                                while let Ok(query) = read_with_length_prefix(&mut stream).await {
                                    let Some(reply) = responder.handle(&query).await else {
                                        break;
                                    };
                                    if send_with_length_prefix(&mut stream, &reply).await.is_err() {
                                        break;
                                    }
                                }
                            });
                        }
                    }
                }
            }
        });

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn truncated_header(query: &[u8]) -> Vec<u8> {
        let mut header = vec![0u8; 12];
        header[..2].copy_from_slice(&query[..2]);
        header[2] = 0x82;
        header[3] = 0x80;
        header
    }

    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockDnsCryptServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
