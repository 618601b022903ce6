use ferrous_dnscrypt_jobs::ProviderStatusJob;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

mod helpers;
use helpers::MockStatusPort;

#[tokio::test]
async fn test_reports_and_saves_each_interval() {
    let port = Arc::new(MockStatusPort::new(3, 2));
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ready.toml").to_str().unwrap().to_string();

    let job = Arc::new(
        ProviderStatusJob::new(port.clone())
            .with_interval(1)
            .with_ready_providers_file(Some(path.clone())),
    );
    tokio::spawn(job.start());

    sleep(Duration::from_millis(300)).await;
    assert_eq!(port.status_calls(), 0);

    sleep(Duration::from_millis(1000)).await;
    assert_eq!(port.status_calls(), 1);
    assert_eq!(port.saved_paths(), vec![path]);
}

#[tokio::test]
async fn test_does_not_save_without_path() {
    let port = Arc::new(MockStatusPort::new(1, 0));
    let job = Arc::new(ProviderStatusJob::new(port.clone()).with_interval(1));
    tokio::spawn(job.start());

    sleep(Duration::from_millis(1200)).await;
    assert_eq!(port.status_calls(), 1);
    assert!(port.saved_paths().is_empty());
}

#[tokio::test]
async fn test_stops_on_cancellation() {
    let port = Arc::new(MockStatusPort::new(1, 1));
    let token = CancellationToken::new();
    let job = Arc::new(
        ProviderStatusJob::new(port.clone())
            .with_interval(1)
            .with_cancellation(token.clone()),
    );
    let handle = tokio::spawn(job.start());

    token.cancel();
    tokio::time::timeout(Duration::from_millis(500), handle)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(port.status_calls(), 0);
}
