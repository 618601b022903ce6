#![allow(dead_code)]
use async_trait::async_trait;
use ferrous_dnscrypt_application::ports::QueryForwarder;
use ferrous_dnscrypt_domain::DomainError;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Answers every query with a fixed A record, echoing id and question.
pub struct StaticForwarder {
    calls: AtomicUsize,
    fail: bool,
}

impl StaticForwarder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn answer_for(query: &[u8]) -> Vec<u8> {
        let mut response = Vec::with_capacity(query.len() + 16);
        response.extend_from_slice(&query[0..2]);
        response.push(0x81);
        response.push(0x80);
        response.extend_from_slice(&query[4..6]);
        response.extend_from_slice(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x00]);
        response.extend_from_slice(&query[12..]);
        response.extend_from_slice(&[
            0xc0, 0x0c, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x3c, 0x00, 0x04, 93, 184, 216,
            34,
        ]);
        response
    }
}

#[async_trait]
impl QueryForwarder for StaticForwarder {
    async fn forward(&self, query: &[u8]) -> Result<Vec<u8>, DomainError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(DomainError::TransportTimeout {
                server: "127.0.0.1:53".to_string(),
            });
        }
        Ok(Self::answer_for(query))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
