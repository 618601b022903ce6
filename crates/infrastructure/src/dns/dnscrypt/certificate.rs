//! Signed provider certificates.
//!
//! Wire format:
//! `"DNSC" | es_version[2] | minor[2] | signature[64] | payload[52]` where
//! the payload is `server_pk[32] | magic[8] | serial | ts_begin | ts_end`
//! with the three `u32` fields big-endian. The ed25519 signature
//! covers everything after it.

use chrono::DateTime;
use ferrous_dnscrypt_domain::dnscrypt::{fingerprint, MAGIC_LEN, PUBLIC_KEY_LEN};
use ferrous_dnscrypt_domain::{Cipher, CryptError};
use ring::signature;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

pub const CERT_MAGIC: [u8; 4] = *b"DNSC";
pub const VERSION_HEADER_LEN: usize = 8;
pub const SIGNATURE_LEN: usize = 64;
pub const SIGNED_PAYLOAD_LEN: usize = PUBLIC_KEY_LEN + MAGIC_LEN + 3 * 4;
pub const MAX_CERTIFICATE_LEN: usize = 65_000;

/// Validity windows longer than this hurt forward secrecy.
pub const RECOMMENDED_ROTATION_PERIOD: u32 = 7 * 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertVersion {
    pub major: [u8; 2],
    pub minor: [u8; 2],
}

impl CertVersion {
    /// `major[0] << 24 | major[1] << 16 | minor[0] << 8 | minor[1]`.
    pub fn packed(&self) -> u32 {
        u32::from_be_bytes([self.major[0], self.major[1], self.minor[0], self.minor[1]])
    }

    pub fn es_version(&self) -> u16 {
        u16::from_be_bytes(self.major)
    }

    pub fn minor(&self) -> u16 {
        u16::from_be_bytes(self.minor)
    }

    fn is_supported(&self) -> bool {
        self.major[0] == 0 && matches!(self.major[1], 1 | 2)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    version: CertVersion,
    server_public_key: [u8; PUBLIC_KEY_LEN],
    magic_query: [u8; MAGIC_LEN],
    serial: u32,
    ts_begin: u32,
    ts_end: u32,
    raw_signed: Vec<u8>,
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("serial", &self.serial)
            .field("version", &self.version.packed())
            .field("cipher", &self.cipher())
            .field("key", &self.encrypting_key_fingerprint())
            .field("ts_begin", &self.ts_begin)
            .field("ts_end", &self.ts_end)
            .finish()
    }
}

pub fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        .min(u32::MAX as u64) as u32
}

impl Certificate {
    /// Parses and verifies `raw` against the provider's signing key, using
    /// the current time for the validity check.
    pub fn parse(signing_key: &[u8; PUBLIC_KEY_LEN], raw: &[u8]) -> Result<Self, CryptError> {
        Self::parse_at(signing_key, raw, unix_now())
    }

    pub fn parse_at(
        signing_key: &[u8; PUBLIC_KEY_LEN],
        raw: &[u8],
        now: u32,
    ) -> Result<Self, CryptError> {
        if raw.len() < VERSION_HEADER_LEN || raw.len() > MAX_CERTIFICATE_LEN {
            return Err(CryptError::invalid_certificate(format!(
                "bad certificate length {}",
                raw.len()
            )));
        }
        if raw[..4] != CERT_MAGIC {
            debug!("TXT record does not carry a certificate");
            return Err(CryptError::invalid_certificate("missing DNSC magic"));
        }

        let version = CertVersion {
            major: [raw[4], raw[5]],
            minor: [raw[6], raw[7]],
        };
        if !version.is_supported() {
            return Err(CryptError::invalid_certificate(format!(
                "unsupported certificate version {}.{}",
                version.es_version(),
                version.minor()
            )));
        }

        let signed = &raw[VERSION_HEADER_LEN..];
        if signed.len() < SIGNATURE_LEN + SIGNED_PAYLOAD_LEN {
            return Err(CryptError::invalid_certificate("truncated signed payload"));
        }
        let (sig, payload) = signed.split_at(SIGNATURE_LEN);

        let mut server_public_key = [0u8; PUBLIC_KEY_LEN];
        server_public_key.copy_from_slice(&payload[..PUBLIC_KEY_LEN]);

        let verifier = signature::UnparsedPublicKey::new(&signature::ED25519, signing_key);
        if verifier.verify(payload, sig).is_err() {
            return Err(CryptError::invalid_certificate(format!(
                "Suspicious certificate. Fingerprints mismatch: {} != {}",
                fingerprint(signing_key),
                fingerprint(&server_public_key)
            )));
        }

        let mut magic_query = [0u8; MAGIC_LEN];
        magic_query.copy_from_slice(&payload[PUBLIC_KEY_LEN..PUBLIC_KEY_LEN + MAGIC_LEN]);
        let word = |at: usize| {
            let start = PUBLIC_KEY_LEN + MAGIC_LEN + at * 4;
            u32::from_be_bytes([
                payload[start],
                payload[start + 1],
                payload[start + 2],
                payload[start + 3],
            ])
        };
        let (serial, ts_begin, ts_end) = (word(0), word(1), word(2));

        if ts_end <= ts_begin {
            return Err(CryptError::invalid_certificate(
                "This certificate has a bogus validity period",
            ));
        }
        if now < ts_begin {
            return Err(CryptError::invalid_certificate(
                "Certificate has not been activated yet",
            ));
        }
        if now > ts_end {
            return Err(CryptError::invalid_certificate("Certificate has expired"));
        }

        Ok(Self {
            version,
            server_public_key,
            magic_query,
            serial,
            ts_begin,
            ts_end,
            raw_signed: raw.to_vec(),
        })
    }

    pub fn version(&self) -> CertVersion {
        self.version
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub fn ts_begin(&self) -> u32 {
        self.ts_begin
    }

    pub fn ts_end(&self) -> u32 {
        self.ts_end
    }

    pub fn server_public_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.server_public_key
    }

    pub fn magic_query(&self) -> &[u8; MAGIC_LEN] {
        &self.magic_query
    }

    pub fn cipher(&self) -> Cipher {
        Cipher::from_es_version(self.version.es_version())
    }

    /// Verbatim signed bytes, re-served to downstream clients.
    pub fn raw_signed(&self) -> &[u8] {
        &self.raw_signed
    }

    pub fn encrypting_key_fingerprint(&self) -> String {
        fingerprint(&self.server_public_key)
    }

    /// Higher packed version wins outright; on equal versions `self` wins
    /// unless `other` has a strictly higher serial.
    pub fn is_preferred_over(&self, other: &Certificate) -> bool {
        let (version, other_version) = (self.version.packed(), other.version.packed());
        if other_version > version {
            info!(
                "Keeping certificate #{} which is for a more recent version than #{}",
                other.serial, self.serial
            );
            return false;
        }
        if other_version < version {
            info!("Favoring version #{} over version #{}", version, other_version);
            return true;
        }
        if other.serial > self.serial {
            info!(
                "Certificate #{} has been superseded by certificate #{}",
                other.serial, self.serial
            );
            return false;
        }
        info!("This certificate supersedes certificate #{}", other.serial);
        true
    }

    /// True when the window exceeds a week. Logged, never fatal.
    pub fn check_rotation_period(&self) -> bool {
        let too_long = self.ts_end - self.ts_begin > RECOMMENDED_ROTATION_PERIOD;
        if too_long {
            warn!(
                serial = self.serial,
                "The key rotation period for this server may exceed the recommended value. \
                 This is bad for forward secrecy."
            );
        }
        too_long
    }

    pub fn log_info(&self) {
        info!(
            serial = self.serial,
            key = %self.encrypting_key_fingerprint(),
            valid_from = %format_day(self.ts_begin),
            valid_to = %format_day(self.ts_end),
            "Certificate #{} is valid from [{}] to [{}]",
            self.serial,
            format_day(self.ts_begin),
            format_day(self.ts_end)
        );
        if self.version.major[1] > 1 {
            info!(
                "Using version {}.{} of the DNSCrypt protocol",
                self.version.major[1],
                self.version.minor()
            );
        }
    }
}

fn format_day(ts: u32) -> String {
    DateTime::from_timestamp(ts as i64, 0)
        .map(|t| t.format("%F").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Parses every candidate, logging the rejected ones, and keeps the most
/// preferred survivor. Ties go to the later candidate.
pub fn select_preferred(
    signing_key: &[u8; PUBLIC_KEY_LEN],
    candidates: &[Vec<u8>],
    now: u32,
) -> Result<Certificate, CryptError> {
    let mut best: Option<Certificate> = None;
    for (index, raw) in candidates.iter().enumerate() {
        let cert = match Certificate::parse_at(signing_key, raw, now) {
            Ok(cert) => cert,
            Err(e) => {
                warn!(candidate = index, error = %e, "Rejected certificate candidate");
                continue;
            }
        };
        if !cert.cipher().is_defined() {
            warn!(candidate = index, "Certificate has an unsupported cipher");
            continue;
        }
        best = match best {
            Some(current) if !cert.is_preferred_over(&current) => Some(current),
            _ => Some(cert),
        };
    }
    best.ok_or(CryptError::NoValidCertificate(candidates.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring::signature::{Ed25519KeyPair, KeyPair};

    fn build(seed: u8, es_version: u8, serial: u32, begin: u32, end: u32) -> (Vec<u8>, [u8; 32]) {
        let pair = Ed25519KeyPair::from_seed_unchecked(&[seed; 32]).unwrap();
        let mut payload = Vec::new();
        payload.extend_from_slice(&[0x42; 32]);
        payload.extend_from_slice(b"qmagic01");
        payload.extend_from_slice(&serial.to_be_bytes());
        payload.extend_from_slice(&begin.to_be_bytes());
        payload.extend_from_slice(&end.to_be_bytes());

        let mut raw = b"DNSC".to_vec();
        raw.extend_from_slice(&[0, es_version, 0, 0]);
        raw.extend_from_slice(pair.sign(&payload).as_ref());
        raw.extend_from_slice(&payload);

        let mut key = [0u8; 32];
        key.copy_from_slice(pair.public_key().as_ref());
        (raw, key)
    }

    #[test]
    fn test_parse_valid_certificate() {
        let (raw, key) = build(1, 2, 7, 1000, 2000);
        let cert = Certificate::parse_at(&key, &raw, 1500).unwrap();

        assert_eq!(cert.serial(), 7);
        assert_eq!(cert.cipher(), Cipher::XChaCha20Poly1305);
        assert_eq!(cert.version().packed(), 0x0002_0000);
        assert_eq!(cert.magic_query(), b"qmagic01");
        assert_eq!(cert.raw_signed(), &raw[..]);
    }

    #[test]
    fn test_validity_window_is_inclusive() {
        let (raw, key) = build(1, 1, 7, 1000, 2000);
        assert!(Certificate::parse_at(&key, &raw, 1000).is_ok());
        assert!(Certificate::parse_at(&key, &raw, 2000).is_ok());
    }

    #[test]
    fn test_not_yet_valid_and_expired_are_distinct() {
        let (raw, key) = build(1, 1, 7, 1000, 2000);
        let early = Certificate::parse_at(&key, &raw, 999).unwrap_err();
        let late = Certificate::parse_at(&key, &raw, 2001).unwrap_err();
        assert_eq!(
            early,
            CryptError::invalid_certificate("Certificate has not been activated yet")
        );
        assert_eq!(late, CryptError::invalid_certificate("Certificate has expired"));
    }

    #[test]
    fn test_bogus_validity_period() {
        let (raw, key) = build(1, 1, 7, 2000, 2000);
        assert_eq!(
            Certificate::parse_at(&key, &raw, 2000).unwrap_err(),
            CryptError::invalid_certificate("This certificate has a bogus validity period")
        );
    }

    #[test]
    fn test_wrong_signing_key_reports_fingerprints() {
        let (raw, _) = build(1, 1, 7, 1000, 2000);
        let (_, other_key) = build(2, 1, 7, 1000, 2000);
        match Certificate::parse_at(&other_key, &raw, 1500) {
            Err(CryptError::InvalidCertificate(msg)) => {
                assert!(msg.starts_with("Suspicious certificate. Fingerprints mismatch: "));
                assert!(msg.contains(&fingerprint(&other_key)));
                assert!(msg.contains(&fingerprint(&[0x42; 32])));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_header_and_lengths() {
        let (raw, key) = build(1, 1, 7, 1000, 2000);

        let mut bad_magic = raw.clone();
        bad_magic[0] = b'X';
        assert!(Certificate::parse_at(&key, &bad_magic, 1500).is_err());

        let mut bad_version = raw.clone();
        bad_version[5] = 3;
        assert!(Certificate::parse_at(&key, &bad_version, 1500).is_err());
        bad_version[4] = 1;
        bad_version[5] = 1;
        assert!(Certificate::parse_at(&key, &bad_version, 1500).is_err());

        assert!(Certificate::parse_at(&key, &raw[..7], 1500).is_err());
        assert!(Certificate::parse_at(&key, &raw[..raw.len() - 1], 1500).is_err());
        assert!(Certificate::parse_at(&key, &vec![0u8; 65_001], 1500).is_err());
    }

    #[test]
    fn test_preference_by_version_then_serial() {
        let (v1_high, key) = build(1, 1, 99, 1000, 2000);
        let (v2_low, _) = build(1, 2, 1, 1000, 2000);
        let (v2_high, _) = build(1, 2, 5, 1000, 2000);
        let v1_high = Certificate::parse_at(&key, &v1_high, 1500).unwrap();
        let v2_low = Certificate::parse_at(&key, &v2_low, 1500).unwrap();
        let v2_high = Certificate::parse_at(&key, &v2_high, 1500).unwrap();

        assert!(v2_low.is_preferred_over(&v1_high));
        assert!(!v1_high.is_preferred_over(&v2_low));
        assert!(v2_high.is_preferred_over(&v2_low));
        assert!(!v2_low.is_preferred_over(&v2_high));
        assert!(v2_low.is_preferred_over(&v2_low.clone()));
    }

    #[test]
    fn test_select_preferred_skips_invalid_candidates() {
        let (good_old, key) = build(1, 1, 3, 1000, 2000);
        let (good_new, _) = build(1, 1, 4, 1000, 2000);
        let (expired, _) = build(1, 2, 10, 100, 200);
        let candidates = vec![good_old, b"garbage".to_vec(), expired, good_new];

        let best = select_preferred(&key, &candidates, 1500).unwrap();
        assert_eq!(best.serial(), 4);
    }

    #[test]
    fn test_select_preferred_without_survivors() {
        let (_, key) = build(1, 1, 3, 1000, 2000);
        let candidates = vec![b"nope".to_vec()];
        assert_eq!(
            select_preferred(&key, &candidates, 1500).unwrap_err(),
            CryptError::NoValidCertificate(1)
        );
    }

    #[test]
    fn test_rotation_period_warning() {
        let (short, key) = build(1, 1, 3, 1000, 1000 + RECOMMENDED_ROTATION_PERIOD);
        let (long, _) = build(1, 1, 3, 1000, 1001 + RECOMMENDED_ROTATION_PERIOD);
        assert!(!Certificate::parse_at(&key, &short, 1500).unwrap().check_rotation_period());
        assert!(Certificate::parse_at(&key, &long, 1500).unwrap().check_rotation_period());
    }

    #[test]
    fn test_format_day() {
        assert_eq!(format_day(1_496_175_122), "2017-05-30");
    }
}
