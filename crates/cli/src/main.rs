use clap::Parser;
use ferrous_dnscrypt_domain::CliOverrides;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod bootstrap;
mod di;
mod server;

#[derive(Parser)]
#[command(name = "ferrous-dnscrypt")]
#[command(version)]
#[command(about = "Ferrous DNSCrypt - DNSCrypt forwarding proxy and server")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// DNS server port
    #[arg(short = 'd', long)]
    dns_port: Option<u16>,

    /// Bind address
    #[arg(short = 'b', long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Provider name to serve DNSCrypt certificates under
    #[arg(long, value_name = "NAME")]
    server_name: Option<String>,

    /// Provider signing public key file (32 raw bytes)
    #[arg(long, value_name = "FILE")]
    server_pubkey: Option<String>,

    /// Server encryption secret key file (32 raw bytes)
    #[arg(long, value_name = "FILE")]
    server_secretkey: Option<String>,

    /// Signed certificate file to serve
    #[arg(long, value_name = "FILE")]
    server_certificate: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        dns_port: cli.dns_port,
        bind_address: cli.bind,
        log_level: cli.log_level,
        server_name: cli.server_name,
        server_public_key_file: cli.server_pubkey,
        server_secret_key_file: cli.server_secretkey,
        server_certificate_file: cli.server_certificate,
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;

    bootstrap::init_logging(&config);

    info!("Starting Ferrous DNSCrypt v{}", env!("CARGO_PKG_VERSION"));

    let services = di::DnsServices::new(&config)?;
    let shutdown = CancellationToken::new();

    services.job_runner(&config, shutdown.clone()).start().await;

    let dns_addr = format!("{}:{}", config.server.bind_address, config.server.dns_port);
    let responder = services.responder;
    let num_workers = config.server.num_workers;

    tokio::select! {
        result = server::start_dns_server(dns_addr, responder, num_workers) => {
            if let Err(e) = result {
                error!(error = %e, "DNS server error");
                shutdown.cancel();
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    shutdown.cancel();
    info!("Server shutdown complete");
    Ok(())
}
