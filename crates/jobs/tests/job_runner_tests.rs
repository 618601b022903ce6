use ferrous_dnscrypt_jobs::{CertificateRefreshJob, JobRunner, ProviderStatusJob};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

mod helpers;
use helpers::{MockRefreshPort, MockStatusPort};

#[tokio::test]
async fn test_job_runner_empty_starts_cleanly() {
    JobRunner::new().start().await;
}

#[tokio::test]
async fn test_job_runner_with_only_certificate_refresh() {
    let port = Arc::new(MockRefreshPort::new(&["127.0.0.1:443"]));

    JobRunner::new()
        .with_certificate_refresh(CertificateRefreshJob::new(port.clone()))
        .start()
        .await;
    sleep(Duration::from_millis(50)).await;

    assert_eq!(port.fetch_count("127.0.0.1:443"), 1);
}

#[tokio::test]
async fn test_job_runner_with_all_jobs() {
    let refresh = Arc::new(MockRefreshPort::new(&["127.0.0.1:443", "[::1]:443"]));
    let status = Arc::new(MockStatusPort::new(2, 2));
    let token = CancellationToken::new();

    JobRunner::new()
        .with_certificate_refresh(CertificateRefreshJob::new(refresh.clone()))
        .with_provider_status(ProviderStatusJob::new(status.clone()))
        .with_shutdown_token(token.clone())
        .start()
        .await;

    sleep(Duration::from_millis(50)).await;
    assert_eq!(refresh.install_count(), 2);

    token.cancel();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(status.status_calls(), 0);
}
