//! Curve25519 box primitives, byte-compatible with libsodium's
//! `crypto_box_*_afternm` for both XSalsa20-Poly1305 and XChaCha20-Poly1305.

use super::envelope::{FullNonce, HalfNonce, FULL_NONCE_LEN, HALF_NONCE_LEN, MAC_LEN};
use crypto_secretbox::aead::generic_array::GenericArray;
use crypto_secretbox::aead::{AeadInPlace, KeyInit};
use crypto_secretbox::{XChaCha20Poly1305, XSalsa20Poly1305};
use ferrous_dnscrypt_domain::dnscrypt::{PUBLIC_KEY_LEN, SECRET_KEY_LEN};
use ferrous_dnscrypt_domain::{Cipher, CryptError};
use rand::rngs::OsRng;
use salsa20::cipher::consts::U10;
use salsa20::cipher::{KeyIvInit, StreamCipher};
use salsa20::XSalsa20;
use std::fmt;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Precomputed box key (`crypto_box_beforenm`).
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SharedKey([u8; 32]);

impl SharedKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedKey([REDACTED])")
    }
}

/// X25519 keypair; the secret half is wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    public: [u8; PUBLIC_KEY_LEN],
    secret: [u8; SECRET_KEY_LEN],
}

impl KeyPair {
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self {
            public: public.to_bytes(),
            secret: secret.to_bytes(),
        }
    }

    pub fn from_secret(secret: [u8; SECRET_KEY_LEN]) -> Self {
        Self {
            public: scalarmult_base(&secret),
            secret,
        }
    }

    pub fn from_parts(public: [u8; PUBLIC_KEY_LEN], secret: [u8; SECRET_KEY_LEN]) -> Self {
        Self { public, secret }
    }

    pub fn public(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.public
    }

    pub fn secret(&self) -> &[u8; SECRET_KEY_LEN] {
        &self.secret
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &ferrous_dnscrypt_domain::dnscrypt::fingerprint(&self.public))
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

pub fn scalarmult_base(secret: &[u8; SECRET_KEY_LEN]) -> [u8; PUBLIC_KEY_LEN] {
    PublicKey::from(&StaticSecret::from(*secret)).to_bytes()
}

/// Derives the box key shared by `our_secret` and `their_public`.
///
/// Low-order peer keys yield an all-zero Diffie-Hellman output and are
/// rejected.
pub fn precompute(
    cipher: Cipher,
    their_public: &[u8; PUBLIC_KEY_LEN],
    our_secret: &[u8; SECRET_KEY_LEN],
) -> Result<SharedKey, CryptError> {
    let secret = StaticSecret::from(*our_secret);
    let shared = secret.diffie_hellman(&PublicKey::from(*their_public));
    if !shared.was_contributory() {
        return Err(CryptError::SuspiciousPublicKey);
    }

    let dh = GenericArray::from_slice(shared.as_bytes());
    let zero = GenericArray::default();
    let mut derived = match cipher {
        Cipher::XSalsa20Poly1305 => salsa20::hsalsa::<U10>(dh, &zero),
        Cipher::XChaCha20Poly1305 => chacha20::hchacha::<U10>(dh, &zero),
        Cipher::Undefined => return Err(CryptError::UndefinedCipher),
    };

    let mut key = [0u8; 32];
    key.copy_from_slice(&derived);
    derived.as_mut_slice().zeroize();
    Ok(SharedKey(key))
}

/// Encrypts `buffer` in place and returns the detached tag.
pub fn seal(
    cipher: Cipher,
    key: &SharedKey,
    nonce: &FullNonce,
    buffer: &mut [u8],
) -> Result<[u8; MAC_LEN], CryptError> {
    let key_bytes = GenericArray::from_slice(key.as_bytes());
    let nonce = GenericArray::from_slice(nonce);
    let tag = match cipher {
        Cipher::XSalsa20Poly1305 => {
            XSalsa20Poly1305::new(key_bytes).encrypt_in_place_detached(nonce, b"", buffer)
        }
        Cipher::XChaCha20Poly1305 => {
            XChaCha20Poly1305::new(key_bytes).encrypt_in_place_detached(nonce, b"", buffer)
        }
        Cipher::Undefined => return Err(CryptError::UndefinedCipher),
    }
    .map_err(|_| CryptError::failure("encryption failed"))?;

    let mut mac = [0u8; MAC_LEN];
    mac.copy_from_slice(&tag);
    Ok(mac)
}

/// Verifies `mac` and decrypts `buffer` in place.
pub fn open(
    cipher: Cipher,
    key: &SharedKey,
    nonce: &FullNonce,
    mac: &[u8],
    buffer: &mut [u8],
) -> Result<(), CryptError> {
    if mac.len() != MAC_LEN {
        return Err(CryptError::failure("bad authenticator length"));
    }
    let key_bytes = GenericArray::from_slice(key.as_bytes());
    let nonce = GenericArray::from_slice(nonce);
    let tag = GenericArray::from_slice(mac);
    match cipher {
        Cipher::XSalsa20Poly1305 => {
            XSalsa20Poly1305::new(key_bytes).decrypt_in_place_detached(nonce, b"", buffer, tag)
        }
        Cipher::XChaCha20Poly1305 => {
            XChaCha20Poly1305::new(key_bytes).decrypt_in_place_detached(nonce, b"", buffer, tag)
        }
        Cipher::Undefined => return Err(CryptError::UndefinedCipher),
    }
    .map_err(|_| CryptError::failure("authentication failed"))
}

/// Fills `out` with the XSalsa20 keystream (`crypto_stream`).
pub fn xsalsa20_keystream(key: &[u8; 32], nonce: &FullNonce, out: &mut [u8]) {
    out.fill(0);
    let mut stream = XSalsa20::new(GenericArray::from_slice(key), GenericArray::from_slice(nonce));
    stream.apply_keystream(out);
}

/// Per-message keypair for ephemeral clients: the secret is the first 32
/// keystream bytes under the client's long-term secret and `nonce`.
pub fn derive_ephemeral(secret_key: &[u8; SECRET_KEY_LEN], nonce: &FullNonce) -> KeyPair {
    let mut secret = [0u8; SECRET_KEY_LEN];
    xsalsa20_keystream(secret_key, nonce, &mut secret);
    KeyPair::from_secret(secret)
}

/// Keyed uniform value in `[0, upper_bound)` derived from the client nonce
/// and the server secret key.
pub fn keyed_uniform(
    client_nonce: &HalfNonce,
    secret_key: &[u8; SECRET_KEY_LEN],
    upper_bound: usize,
) -> usize {
    if upper_bound == 0 {
        return 0;
    }
    let mut nonce = [0u8; FULL_NONCE_LEN];
    nonce[..HALF_NONCE_LEN].copy_from_slice(client_nonce);
    nonce[HALF_NONCE_LEN..].copy_from_slice(client_nonce);

    let mut word = [0u8; 4];
    xsalsa20_keystream(secret_key, &nonce, &mut word);
    u32::from_le_bytes(word) as usize % upper_bound
}
