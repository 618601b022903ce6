#![allow(dead_code)]

use async_trait::async_trait;
use ferrous_dnscrypt_application::ports::QueryForwarder;
use ferrous_dnscrypt_domain::DomainError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Forwarder returning a scripted result and counting calls.
pub struct MockForwarder {
    name: &'static str,
    result: Mutex<Result<Vec<u8>, DomainError>>,
    calls: AtomicUsize,
}

impl MockForwarder {
    pub fn replying(name: &'static str, reply: Vec<u8>) -> Self {
        Self {
            name,
            result: Mutex::new(Ok(reply)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &'static str, error: DomainError) -> Self {
        Self {
            name,
            result: Mutex::new(Err(error)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryForwarder for MockForwarder {
    async fn forward(&self, _query: &[u8]) -> Result<Vec<u8>, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.lock().unwrap().clone()
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
