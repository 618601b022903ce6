use ferrous_dnscrypt_application::ports::ProviderStatusPort;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const DEFAULT_STATUS_INTERVAL_SECS: u64 = 420;

/// Periodically reports how many providers are usable and, when a path is
/// configured, writes the ready ones to disk.
pub struct ProviderStatusJob {
    status: Arc<dyn ProviderStatusPort>,
    interval_secs: u64,
    ready_providers_file: Option<String>,
    shutdown: CancellationToken,
}

impl ProviderStatusJob {
    pub fn new(status: Arc<dyn ProviderStatusPort>) -> Self {
        Self {
            status,
            interval_secs: DEFAULT_STATUS_INTERVAL_SECS,
            ready_providers_file: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, secs: u64) -> Self {
        self.interval_secs = secs.max(1);
        self
    }

    pub fn with_ready_providers_file(mut self, path: Option<String>) -> Self {
        self.ready_providers_file = path;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn start(self: Arc<Self>) {
        info!(
            interval_secs = self.interval_secs,
            "Starting provider status job"
        );

        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // The first tick completes immediately; providers are still fetching.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("ProviderStatusJob: shutting down");
                    break;
                }
                _ = interval.tick() => {
                    self.report();
                }
            }
        }
    }

    fn report(&self) {
        let status = self.status.status();
        if status.ready == 0 {
            warn!(total = status.total, "No DNSCrypt provider is ready");
        } else {
            info!(
                ready = status.ready,
                total = status.total,
                "DNSCrypt providers ready"
            );
        }

        if let Some(path) = &self.ready_providers_file {
            match self.status.save_ready_providers(path) {
                Ok(saved) => info!(path = %path, saved, "Ready providers saved"),
                Err(e) => error!(path = %path, error = %e, "Failed to save ready providers"),
            }
        }
    }
}
