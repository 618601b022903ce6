//! Wire layout of DNSCrypt query and response envelopes.
//!
//! Query:    `magic[8] | client_pk[32] | client_nonce[12] | mac[16] | ciphertext`
//! Response: `magic[8] | client_nonce[12] | server_nonce[12] | mac[16] | ciphertext`

use super::padding::MIN_PADDING;
use ferrous_dnscrypt_domain::dnscrypt::{MAGIC_LEN, PUBLIC_KEY_LEN};
use ferrous_dnscrypt_domain::CryptError;

pub const HALF_NONCE_LEN: usize = 12;
pub const FULL_NONCE_LEN: usize = 2 * HALF_NONCE_LEN;
pub const MAC_LEN: usize = 16;

pub const QUERY_HEADER_LEN: usize = MAGIC_LEN + PUBLIC_KEY_LEN + HALF_NONCE_LEN;
pub const RESPONSE_HEADER_LEN: usize = MAGIC_LEN + 2 * HALF_NONCE_LEN;

/// Header plus authentication tag in front of a query ciphertext.
pub const QUERY_OVERHEAD: usize = QUERY_HEADER_LEN + MAC_LEN;
pub const RESPONSE_OVERHEAD: usize = RESPONSE_HEADER_LEN + MAC_LEN;

pub const RESPONSE_MAGIC: [u8; MAGIC_LEN] = *b"r6fnvWj8";

/// Largest envelope either side will produce.
pub const MAX_ENVELOPE_SIZE: usize = 65_535 - 10_000;

/// Room left at the end of a padded envelope for a TCP length prefix.
pub const LENGTH_PREFIX_RESERVE: usize = 2;

/// Largest plaintext that still fits an envelope with its padding. Both
/// directions size the padded body off the query overhead.
pub const MAX_MESSAGE_LEN: usize =
    MAX_ENVELOPE_SIZE - QUERY_OVERHEAD - LENGTH_PREFIX_RESERVE - MIN_PADDING;

/// Smallest plaintext accepted after decryption (a bare DNS header).
pub const MIN_DNS_MESSAGE_LEN: usize = 12;

pub type HalfNonce = [u8; HALF_NONCE_LEN];
pub type FullNonce = [u8; FULL_NONCE_LEN];

pub fn full_nonce(client: &HalfNonce, server: &HalfNonce) -> FullNonce {
    let mut nonce = [0u8; FULL_NONCE_LEN];
    nonce[..HALF_NONCE_LEN].copy_from_slice(client);
    nonce[HALF_NONCE_LEN..].copy_from_slice(server);
    nonce
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryHeader {
    pub magic: [u8; MAGIC_LEN],
    pub public_key: [u8; PUBLIC_KEY_LEN],
    pub client_nonce: HalfNonce,
}

impl QueryHeader {
    pub fn read_from(bytes: &[u8]) -> Option<Self> {
        let header = bytes.get(..QUERY_HEADER_LEN)?;
        let mut magic = [0u8; MAGIC_LEN];
        let mut public_key = [0u8; PUBLIC_KEY_LEN];
        let mut client_nonce = [0u8; HALF_NONCE_LEN];
        magic.copy_from_slice(&header[..MAGIC_LEN]);
        public_key.copy_from_slice(&header[MAGIC_LEN..MAGIC_LEN + PUBLIC_KEY_LEN]);
        client_nonce.copy_from_slice(&header[MAGIC_LEN + PUBLIC_KEY_LEN..]);
        Some(Self {
            magic,
            public_key,
            client_nonce,
        })
    }

    /// Writes the header into the first `QUERY_HEADER_LEN` bytes of `out`.
    pub fn write_to(&self, out: &mut [u8]) {
        out[..MAGIC_LEN].copy_from_slice(&self.magic);
        out[MAGIC_LEN..MAGIC_LEN + PUBLIC_KEY_LEN].copy_from_slice(&self.public_key);
        out[MAGIC_LEN + PUBLIC_KEY_LEN..QUERY_HEADER_LEN].copy_from_slice(&self.client_nonce);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub magic: [u8; MAGIC_LEN],
    pub client_nonce: HalfNonce,
    pub server_nonce: HalfNonce,
}

impl ResponseHeader {
    pub fn new(client_nonce: HalfNonce, server_nonce: HalfNonce) -> Self {
        Self {
            magic: RESPONSE_MAGIC,
            client_nonce,
            server_nonce,
        }
    }

    pub fn read_from(bytes: &[u8]) -> Option<Self> {
        let header = bytes.get(..RESPONSE_HEADER_LEN)?;
        let mut magic = [0u8; MAGIC_LEN];
        let mut client_nonce = [0u8; HALF_NONCE_LEN];
        let mut server_nonce = [0u8; HALF_NONCE_LEN];
        magic.copy_from_slice(&header[..MAGIC_LEN]);
        client_nonce.copy_from_slice(&header[MAGIC_LEN..MAGIC_LEN + HALF_NONCE_LEN]);
        server_nonce.copy_from_slice(&header[MAGIC_LEN + HALF_NONCE_LEN..]);
        Some(Self {
            magic,
            client_nonce,
            server_nonce,
        })
    }

    pub fn write_to(&self, out: &mut [u8]) {
        out[..MAGIC_LEN].copy_from_slice(&self.magic);
        out[MAGIC_LEN..MAGIC_LEN + HALF_NONCE_LEN].copy_from_slice(&self.client_nonce);
        out[MAGIC_LEN + HALF_NONCE_LEN..RESPONSE_HEADER_LEN].copy_from_slice(&self.server_nonce);
    }

    pub fn full_nonce(&self) -> FullNonce {
        full_nonce(&self.client_nonce, &self.server_nonce)
    }
}

/// Rejects messages the peer could not unpad.
pub fn check_message_len(len: usize) -> Result<(), CryptError> {
    if len > MAX_MESSAGE_LEN {
        return Err(CryptError::MessageTooLarge {
            len,
            max: MAX_MESSAGE_LEN,
        });
    }
    Ok(())
}

/// True when `bytes` is long enough to be a query envelope and starts with
/// the certificate's query magic.
pub fn is_dnscrypt_query(magic: &[u8; MAGIC_LEN], bytes: &[u8]) -> bool {
    bytes.len() > QUERY_OVERHEAD && bytes[..MAGIC_LEN] == magic[..]
}
