#![allow(dead_code)]

use async_trait::async_trait;
use ferrous_dnscrypt_application::ports::{
    CertificateRefreshPort, InstalledCertificate, ProviderStatus, ProviderStatusPort,
};
use ferrous_dnscrypt_domain::{Cipher, CryptError, DomainError};
use std::collections::HashMap;
use std::time::Duration;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum FetchBehavior {
    Certificate,
    Garbage,
    Timeout,
}

pub struct MockRefreshPort {
    ids: Vec<String>,
    behavior: Mutex<HashMap<String, FetchBehavior>>,
    fetches: Mutex<HashMap<String, Vec<Instant>>>,
    installs: Arc<AtomicU64>,
}

impl MockRefreshPort {
    pub fn new(ids: &[&str]) -> Self {
        Self {
            ids: ids.iter().map(|id| id.to_string()).collect(),
            behavior: Mutex::new(HashMap::new()),
            fetches: Mutex::new(HashMap::new()),
            installs: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_behavior(self, id: &str, behavior: FetchBehavior) -> Self {
        self.behavior
            .lock()
            .unwrap()
            .insert(id.to_string(), behavior);
        self
    }

    pub fn fetch_count(&self, id: &str) -> u64 {
        self.fetch_times(id).len() as u64
    }

    /// Clock readings of every fetch for `id`, oldest first.
    pub fn fetch_times(&self, id: &str) -> Vec<Instant> {
        self.fetches
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Gaps between consecutive fetches for `id`.
    pub fn fetch_gaps(&self, id: &str) -> Vec<Duration> {
        self.fetch_times(id)
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .collect()
    }

    pub fn install_count(&self) -> u64 {
        self.installs.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CertificateRefreshPort for MockRefreshPort {
    fn provider_ids(&self) -> Vec<String> {
        self.ids.clone()
    }

    async fn fetch_certificates(&self, provider_id: &str) -> Result<Vec<Vec<u8>>, DomainError> {
        self.fetches
            .lock()
            .unwrap()
            .entry(provider_id.to_string())
            .or_default()
            .push(Instant::now());
        let behavior = self
            .behavior
            .lock()
            .unwrap()
            .get(provider_id)
            .copied()
            .unwrap_or(FetchBehavior::Certificate);
        match behavior {
            FetchBehavior::Certificate => Ok(vec![b"DNSC-valid".to_vec()]),
            FetchBehavior::Garbage => Ok(vec![b"garbage".to_vec()]),
            FetchBehavior::Timeout => Err(DomainError::TransportTimeout {
                server: provider_id.to_string(),
            }),
        }
    }

    fn install_certificate(
        &self,
        _provider_id: &str,
        candidates: &[Vec<u8>],
    ) -> Result<InstalledCertificate, DomainError> {
        if candidates.iter().any(|c| c.starts_with(b"DNSC")) {
            self.installs.fetch_add(1, Ordering::Relaxed);
            Ok(InstalledCertificate {
                serial: 1,
                version: 0x0002_0000,
                cipher: Cipher::XChaCha20Poly1305,
                ts_begin: 0,
                ts_end: u32::MAX,
            })
        } else {
            Err(CryptError::NoValidCertificate(candidates.len()).into())
        }
    }
}

pub struct MockStatusPort {
    total: usize,
    ready: usize,
    status_calls: AtomicUsize,
    saved: Mutex<Vec<String>>,
}

impl MockStatusPort {
    pub fn new(total: usize, ready: usize) -> Self {
        Self {
            total,
            ready,
            status_calls: AtomicUsize::new(0),
            saved: Mutex::new(Vec::new()),
        }
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::Relaxed)
    }

    pub fn saved_paths(&self) -> Vec<String> {
        self.saved.lock().unwrap().clone()
    }
}

impl ProviderStatusPort for MockStatusPort {
    fn status(&self) -> ProviderStatus {
        self.status_calls.fetch_add(1, Ordering::Relaxed);
        ProviderStatus {
            total: self.total,
            ready: self.ready,
        }
    }

    fn save_ready_providers(&self, path: &str) -> Result<usize, DomainError> {
        self.saved.lock().unwrap().push(path.to_string());
        Ok(self.ready)
    }
}
