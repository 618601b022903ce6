//! Binary key and certificate files.

use super::certificate::Certificate;
use super::crypto::KeyPair;
use ferrous_dnscrypt_domain::dnscrypt::{fingerprint, PUBLIC_KEY_LEN, SECRET_KEY_LEN};
use ferrous_dnscrypt_domain::DomainError;
use std::path::Path;
use tracing::debug;
use zeroize::Zeroize;

/// Largest certificate file accepted from disk.
const MAX_CERTIFICATE_FILE_LEN: usize = 1024;

/// Reads a raw 32-byte key file.
pub fn load_key_file(path: impl AsRef<Path>) -> Result<[u8; 32], DomainError> {
    let path = path.as_ref();
    let mut bytes = std::fs::read(path)
        .map_err(|e| DomainError::IoError(format!("{}: {}", path.display(), e)))?;
    if bytes.len() != 32 {
        let len = bytes.len();
        bytes.zeroize();
        return Err(DomainError::InvalidKey(format!(
            "{}: expected 32 bytes, got {}",
            path.display(),
            len
        )));
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    bytes.zeroize();
    Ok(key)
}

/// Loads an X25519 keypair from separate public and secret key files and
/// checks that they belong together.
pub fn load_keypair(
    public_path: impl AsRef<Path>,
    secret_path: impl AsRef<Path>,
) -> Result<KeyPair, DomainError> {
    let public: [u8; PUBLIC_KEY_LEN] = load_key_file(public_path)?;
    let secret: [u8; SECRET_KEY_LEN] = load_key_file(secret_path)?;
    let pair = KeyPair::from_secret(secret);
    if pair.public() != &public {
        return Err(DomainError::InvalidKey(format!(
            "public key {} does not match the secret key",
            fingerprint(&public)
        )));
    }
    debug!(key = %fingerprint(&public), "Loaded client keypair");
    Ok(pair)
}

/// Reads a signed certificate and verifies it against the provider's
/// signing key.
pub fn load_certificate_file(
    path: impl AsRef<Path>,
    signing_key: &[u8; PUBLIC_KEY_LEN],
) -> Result<Certificate, DomainError> {
    let path = path.as_ref();
    let raw = std::fs::read(path)
        .map_err(|e| DomainError::IoError(format!("{}: {}", path.display(), e)))?;
    if raw.len() > MAX_CERTIFICATE_FILE_LEN {
        return Err(DomainError::InvalidKey(format!(
            "Failed to load certificate from binary file: {}",
            path.display()
        )));
    }
    Ok(Certificate::parse(signing_key, &raw)?)
}
