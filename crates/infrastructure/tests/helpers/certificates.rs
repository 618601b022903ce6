#![allow(dead_code)]
use ferrous_dnscrypt_domain::DnsCryptProvider;
use ferrous_dnscrypt_infrastructure::dns::dnscrypt::KeyPair;
use ring::signature::{Ed25519KeyPair, KeyPair as _};
use std::net::SocketAddr;

/// Ed25519 identity a provider signs its certificates with.
pub struct SigningIdentity {
    pair: Ed25519KeyPair,
}

impl SigningIdentity {
    pub fn from_seed(seed: u8) -> Self {
        Self {
            pair: Ed25519KeyPair::from_seed_unchecked(&[seed; 32]).unwrap(),
        }
    }

    pub fn public_key(&self) -> [u8; 32] {
        let mut key = [0u8; 32];
        key.copy_from_slice(self.pair.public_key().as_ref());
        key
    }

    pub fn provider(&self, provider_name: &str, address: SocketAddr) -> DnsCryptProvider {
        DnsCryptProvider {
            name: format!("test-{}", address.port()),
            provider_name: provider_name.to_string(),
            signing_key: self.public_key(),
            address,
            tcp_only: false,
            dnssec: true,
            no_logs: true,
        }
    }

    pub fn sign(&self, builder: &CertificateBuilder) -> Vec<u8> {
        let payload = builder.payload();
        let mut raw = b"DNSC".to_vec();
        raw.extend_from_slice(&builder.major);
        raw.extend_from_slice(&builder.minor);
        raw.extend_from_slice(self.pair.sign(&payload).as_ref());
        raw.extend_from_slice(&payload);
        raw
    }
}

/// Fields of a certificate before signing.
#[derive(Clone)]
pub struct CertificateBuilder {
    pub major: [u8; 2],
    pub minor: [u8; 2],
    pub server_public_key: [u8; 32],
    pub magic: [u8; 8],
    pub serial: u32,
    pub ts_begin: u32,
    pub ts_end: u32,
}

impl CertificateBuilder {
    /// A day-long certificate for `keys` around `now`, magic taken from the
    /// key prefix.
    pub fn for_keys(keys: &KeyPair, es_version: u8, serial: u32, now: u32) -> Self {
        let server_public_key = *keys.public();
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&server_public_key[..8]);
        Self {
            major: [0, es_version],
            minor: [0, 0],
            server_public_key,
            magic,
            serial,
            ts_begin: now - 3600,
            ts_end: now + 86_400,
        }
    }

    pub fn payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(52);
        payload.extend_from_slice(&self.server_public_key);
        payload.extend_from_slice(&self.magic);
        payload.extend_from_slice(&self.serial.to_be_bytes());
        payload.extend_from_slice(&self.ts_begin.to_be_bytes());
        payload.extend_from_slice(&self.ts_end.to_be_bytes());
        payload
    }
}

/// A recursive `example.com. IN A` query.
pub fn query_message(id: u16) -> Vec<u8> {
    let mut query = Vec::new();
    query.extend_from_slice(&id.to_be_bytes());
    query.extend_from_slice(&[0x01, 0x00, 0, 1, 0, 0, 0, 0, 0, 0]);
    query.extend_from_slice(&[7, b'e', b'x', b'a', b'm', b'p', b'l', b'e']);
    query.extend_from_slice(&[3, b'c', b'o', b'm', 0, 0, 1, 0, 1]);
    query
}
