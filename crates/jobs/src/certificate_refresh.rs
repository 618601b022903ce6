use ferrous_dnscrypt_application::ports::CertificateRefreshPort;
use ferrous_dnscrypt_domain::DomainError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const MIN_RETRY_DELAY_SECS: u64 = 17;
pub const MAX_RETRY_DELAY_SECS: u64 = 5 * 60;
pub const RETRY_STEPS: u32 = 100;
pub const SUCCESS_DELAY_SECS: u64 = 60 * 60;
pub const SUCCESS_JITTER_SECS: u64 = 100;

/// Requests that may go unanswered in a row before a provider is given up.
pub const MAX_UNANSWERED_ATTEMPTS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Querying,
    GivenUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    /// A request is still outstanding.
    Wait,
    /// Issue a certificate request now.
    Request,
    /// Too many unanswered requests; stop the timer.
    GiveUp,
}

/// Delay before the next request after `step` consecutive failures.
pub fn failure_delay(step: u32) -> Duration {
    let step = u64::from(step.min(RETRY_STEPS));
    Duration::from_secs(
        MIN_RETRY_DELAY_SECS
            + step * (MAX_RETRY_DELAY_SECS - MIN_RETRY_DELAY_SECS) / u64::from(RETRY_STEPS),
    )
}

/// Refresh bookkeeping for one provider.
///
/// The timer is periodic: it fires every `period` until rescheduled. A
/// reschedule made while an earlier one has not fired yet is ignored.
#[derive(Debug)]
pub struct RefreshState {
    phase: RefreshPhase,
    attempts: u32,
    retry_step: u32,
    period: Duration,
    rescheduled: bool,
}

impl RefreshState {
    pub fn new() -> Self {
        Self {
            phase: RefreshPhase::Idle,
            attempts: 0,
            retry_step: 0,
            period: Duration::from_secs(MIN_RETRY_DELAY_SECS),
            rescheduled: false,
        }
    }

    pub fn phase(&self) -> RefreshPhase {
        self.phase
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn retry_step(&self) -> u32 {
        self.retry_step
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Called on start and whenever the timer fires.
    pub fn tick(&mut self) -> TickAction {
        self.rescheduled = false;
        match self.phase {
            RefreshPhase::GivenUp => TickAction::GiveUp,
            RefreshPhase::Querying => TickAction::Wait,
            RefreshPhase::Idle if self.attempts > MAX_UNANSWERED_ATTEMPTS => {
                self.phase = RefreshPhase::GivenUp;
                TickAction::GiveUp
            }
            RefreshPhase::Idle => {
                self.attempts += 1;
                self.phase = RefreshPhase::Querying;
                TickAction::Request
            }
        }
    }

    /// A reply arrived and a certificate was installed.
    pub fn on_installed(&mut self) -> Option<Duration> {
        self.attempts = 0;
        self.retry_step = 0;
        self.phase = RefreshPhase::Idle;
        let jitter = fastrand::u64(..SUCCESS_JITTER_SECS);
        self.reschedule(Duration::from_secs(SUCCESS_DELAY_SECS + jitter))
    }

    /// A reply arrived but carried no usable certificate.
    pub fn on_rejected(&mut self) -> Option<Duration> {
        self.attempts = 0;
        self.on_failure()
    }

    /// The request could not be sent or timed out.
    pub fn on_unanswered(&mut self) -> Option<Duration> {
        self.on_failure()
    }

    fn on_failure(&mut self) -> Option<Duration> {
        if self.phase == RefreshPhase::GivenUp {
            return None;
        }
        self.phase = RefreshPhase::Idle;
        if self.rescheduled {
            return None;
        }
        let delay = failure_delay(self.retry_step);
        if self.retry_step < RETRY_STEPS {
            self.retry_step += 1;
        }
        debug!(delay_secs = delay.as_secs(), "Certificate retry after failure");
        self.reschedule(delay)
    }

    fn reschedule(&mut self, delay: Duration) -> Option<Duration> {
        if self.rescheduled {
            return None;
        }
        self.period = delay;
        self.rescheduled = true;
        Some(delay)
    }
}

impl Default for RefreshState {
    fn default() -> Self {
        Self::new()
    }
}

type FetchResult = Result<Vec<Vec<u8>>, DomainError>;

/// Keeps every configured provider's certificate fresh. Each provider is
/// driven by its own task.
pub struct CertificateRefreshJob {
    port: Arc<dyn CertificateRefreshPort>,
    shutdown: CancellationToken,
}

impl CertificateRefreshJob {
    pub fn new(port: Arc<dyn CertificateRefreshPort>) -> Self {
        Self {
            port,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn start(self: Arc<Self>) {
        let ids = self.port.provider_ids();
        info!(providers = ids.len(), "Starting certificate refresh job");

        for id in ids {
            let port = Arc::clone(&self.port);
            let shutdown = self.shutdown.clone();
            tokio::spawn(refresh_provider(port, id, shutdown));
        }
    }
}

async fn refresh_provider(
    port: Arc<dyn CertificateRefreshPort>,
    id: String,
    shutdown: CancellationToken,
) {
    if shutdown.is_cancelled() {
        return;
    }

    let mut state = RefreshState::new();
    let mut deadline = Instant::now() + state.period();
    let mut in_flight: Option<JoinHandle<FetchResult>> = None;

    if state.tick() == TickAction::Request {
        in_flight = Some(spawn_fetch(&port, &id));
    }

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!(provider = %id, "Certificate refresh stopped");
                break;
            }
            _ = tokio::time::sleep_until(deadline) => {
                deadline = Instant::now() + state.period();
                match state.tick() {
                    TickAction::Wait => {
                        debug!(provider = %id, "Certificate request is still alive");
                    }
                    TickAction::Request => {
                        debug!(provider = %id, attempt = state.attempts(), "Certificate request");
                        if let Some(stale) = in_flight.replace(spawn_fetch(&port, &id)) {
                            stale.abort();
                        }
                    }
                    TickAction::GiveUp => {
                        warn!(provider = %id, "Too many certificate requests, giving up");
                        break;
                    }
                }
            }
            joined = wait_in_flight(&mut in_flight) => {
                in_flight = None;
                let delay = match flatten(joined) {
                    Ok(candidates) => match port.install_certificate(&id, &candidates) {
                        Ok(installed) => {
                            debug!(
                                provider = %id,
                                serial = installed.serial,
                                cipher = %installed.cipher,
                                "Certificate refreshed"
                            );
                            state.on_installed()
                        }
                        Err(e) => {
                            warn!(provider = %id, error = %e, "No usable certificate");
                            state.on_rejected()
                        }
                    },
                    Err(DomainError::InvalidDnsResponse(reason)) => {
                        warn!(provider = %id, reason = %reason, "Bad certificate response");
                        state.on_rejected()
                    }
                    Err(e) => {
                        warn!(provider = %id, error = %e, "Certificate request failed");
                        state.on_unanswered()
                    }
                };
                if let Some(delay) = delay {
                    deadline = Instant::now() + delay;
                }
            }
        }
    }

    if let Some(handle) = in_flight.take() {
        handle.abort();
    }
}

fn spawn_fetch(port: &Arc<dyn CertificateRefreshPort>, id: &str) -> JoinHandle<FetchResult> {
    let port = Arc::clone(port);
    let id = id.to_string();
    tokio::spawn(async move { port.fetch_certificates(&id).await })
}

async fn wait_in_flight(
    handle: &mut Option<JoinHandle<FetchResult>>,
) -> Result<FetchResult, JoinError> {
    match handle {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

fn flatten(joined: Result<FetchResult, JoinError>) -> FetchResult {
    joined.map_err(|e| {
        DomainError::TransportError(format!("certificate request aborted: {}", e))
    })?
}
