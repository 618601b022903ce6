use ferrous_dnscrypt_infrastructure::dns::transport::tcp::{
    read_with_length_prefix, send_with_length_prefix,
};
use ferrous_dnscrypt_infrastructure::dns::DnsCryptResponder;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Largest datagram accepted; DNSCrypt queries are padded well past 512.
const MAX_UDP_QUERY_SIZE: usize = 65_535;
const TCP_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn start_dns_server(
    bind_addr: String,
    responder: Arc<DnsCryptResponder>,
    num_workers: usize,
) -> anyhow::Result<()> {
    let socket_addr: SocketAddr = bind_addr.parse()?;
    let domain = if socket_addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    info!(
        bind_address = %socket_addr,
        num_workers,
        serving = responder.is_serving(),
        "Starting DNS server with SO_REUSEPORT"
    );

    let mut join_set: JoinSet<()> = JoinSet::new();

    for i in 0..num_workers {
        let udp_socket = Arc::new(create_udp_socket(domain, socket_addr)?);
        let responder_udp = Arc::clone(&responder);
        join_set.spawn(async move {
            run_udp_worker(udp_socket, responder_udp, i).await;
        });

        let tcp_listener = create_tcp_listener(domain, socket_addr)?;
        let responder_tcp = Arc::clone(&responder);
        join_set.spawn(async move {
            run_tcp_worker(tcp_listener, responder_tcp, i).await;
        });
    }

    info!("DNS server ready: {} workers on {}", num_workers, socket_addr);

    while join_set.join_next().await.is_some() {}
    Ok(())
}

async fn run_udp_worker(
    socket: Arc<UdpSocket>,
    responder: Arc<DnsCryptResponder>,
    worker_id: usize,
) {
    let mut recv_buf = vec![0u8; MAX_UDP_QUERY_SIZE];

    loop {
        let (n, from) = match socket.recv_from(&mut recv_buf).await {
            Ok(received) => received,
            Err(e) => {
                error!(worker = worker_id, error = %e, "UDP recv error");
                continue;
            }
        };

        let responder = Arc::clone(&responder);
        let socket = Arc::clone(&socket);
        let query: Arc<[u8]> = Arc::from(&recv_buf[..n]);
        tokio::spawn(async move {
            if let Some(response) = responder.handle(&query).await {
                if let Err(e) = socket.send_to(&response, from).await {
                    debug!(client = %from, error = %e, "UDP send failed");
                }
            }
        });
    }
}

async fn run_tcp_worker(
    listener: TcpListener,
    responder: Arc<DnsCryptResponder>,
    worker_id: usize,
) {
    loop {
        let (stream, from) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(worker = worker_id, error = %e, "TCP accept error");
                continue;
            }
        };

        let responder = Arc::clone(&responder);
        tokio::spawn(async move {
            serve_tcp_connection(stream, responder).await;
            debug!(client = %from, "TCP connection closed");
        });
    }
}

/// Answers length-prefixed queries until the client goes idle or a query
/// is dropped.
async fn serve_tcp_connection(mut stream: TcpStream, responder: Arc<DnsCryptResponder>) {
    loop {
        let query = match tokio::time::timeout(
            TCP_IDLE_TIMEOUT,
            read_with_length_prefix(&mut stream),
        )
        .await
        {
            Ok(Ok(query)) => query,
            _ => return,
        };

        let Some(response) = responder.handle(&query).await else {
            return;
        };
        if send_with_length_prefix(&mut stream, &response).await.is_err() {
            return;
        }
    }
}

fn create_udp_socket(domain: Domain, socket_addr: SocketAddr) -> anyhow::Result<UdpSocket> {
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    if socket_addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_recv_buffer_size(512 * 1024)?;
    socket.set_send_buffer_size(512 * 1024)?;
    socket.bind(&socket_addr.into())?;
    socket.set_nonblocking(true)?;
    let std_socket: std::net::UdpSocket = socket.into();
    Ok(UdpSocket::from_std(std_socket)?)
}

fn create_tcp_listener(domain: Domain, socket_addr: SocketAddr) -> anyhow::Result<TcpListener> {
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    if socket_addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;
    socket.set_nonblocking(true)?;
    let std_listener: std::net::TcpListener = socket.into();
    Ok(TcpListener::from_std(std_listener)?)
}
