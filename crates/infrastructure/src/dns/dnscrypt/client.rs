//! Client side of the channel: sealing queries to a provider and opening
//! its responses.

use super::certificate::Certificate;
use super::crypto::{self, KeyPair, SharedKey};
use super::envelope::{
    check_message_len, full_nonce, FullNonce, HalfNonce, QueryHeader, ResponseHeader, HALF_NONCE_LEN,
    LENGTH_PREFIX_RESERVE, MAX_ENVELOPE_SIZE, MIN_DNS_MESSAGE_LEN, QUERY_HEADER_LEN,
    QUERY_OVERHEAD, RESPONSE_HEADER_LEN, RESPONSE_MAGIC, RESPONSE_OVERHEAD,
};
use super::nonce::new_half_nonce;
use super::padding::{pad, unpad};
use ferrous_dnscrypt_domain::dnscrypt::{MAGIC_LEN, PUBLIC_KEY_LEN};
use ferrous_dnscrypt_domain::{Cipher, CryptError};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;

/// Client identity used towards providers.
#[derive(Debug, Clone)]
pub enum ClientKeys {
    /// A keypair is derived per message from the long-term secret, the
    /// client half nonce and `nonce_pad`.
    Ephemeral { seed: KeyPair, nonce_pad: HalfNonce },
    Persistent(KeyPair),
}

impl ClientKeys {
    pub fn ephemeral() -> Self {
        debug!("Ephemeral keys enabled, generating a new seed");
        let mut nonce_pad = [0u8; HALF_NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_pad);
        Self::Ephemeral {
            seed: KeyPair::generate(),
            nonce_pad,
        }
    }

    pub fn persistent(keypair: KeyPair) -> Self {
        Self::Persistent(keypair)
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Self::Ephemeral { .. })
    }
}

/// Client side of a DNSCrypt channel to one provider.
#[derive(Debug, Clone)]
pub struct ClientSession {
    keys: ClientKeys,
    magic_query: [u8; MAGIC_LEN],
    cipher: Cipher,
    provider_public_key: [u8; PUBLIC_KEY_LEN],
    /// Only populated for persistent keys.
    shared_key: Option<SharedKey>,
}

impl ClientSession {
    pub fn new(keys: ClientKeys, certificate: &Certificate) -> Result<Self, CryptError> {
        Self::with_parameters(
            keys,
            *certificate.magic_query(),
            certificate.cipher(),
            *certificate.server_public_key(),
        )
    }

    pub fn with_parameters(
        keys: ClientKeys,
        magic_query: [u8; MAGIC_LEN],
        cipher: Cipher,
        provider_public_key: [u8; PUBLIC_KEY_LEN],
    ) -> Result<Self, CryptError> {
        let mut session = Self {
            keys,
            magic_query,
            cipher,
            provider_public_key,
            shared_key: None,
        };
        session.rekey()?;
        Ok(session)
    }

    /// Switches to the magic, cipher and encrypting key of `certificate`.
    pub fn reconfigure(&mut self, certificate: &Certificate) -> Result<(), CryptError> {
        self.magic_query = *certificate.magic_query();
        self.cipher = certificate.cipher();
        self.provider_public_key = *certificate.server_public_key();
        self.rekey()
    }

    fn rekey(&mut self) -> Result<(), CryptError> {
        if !self.cipher.is_defined() {
            return Err(CryptError::UndefinedCipher);
        }
        self.shared_key = match &self.keys {
            ClientKeys::Persistent(pair) => Some(crypto::precompute(
                self.cipher,
                &self.provider_public_key,
                pair.secret(),
            )?),
            ClientKeys::Ephemeral { .. } => None,
        };
        Ok(())
    }

    pub fn keys(&self) -> &ClientKeys {
        &self.keys
    }

    pub fn magic_query(&self) -> &[u8; MAGIC_LEN] {
        &self.magic_query
    }

    pub fn cipher(&self) -> Cipher {
        self.cipher
    }

    pub fn provider_public_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.provider_public_key
    }

    /// Key and public half used for the message sent with `client_nonce`.
    fn message_key(
        &self,
        client_nonce: &HalfNonce,
    ) -> Result<(SharedKey, [u8; PUBLIC_KEY_LEN]), CryptError> {
        match (&self.keys, &self.shared_key) {
            (ClientKeys::Persistent(pair), Some(shared)) => Ok((shared.clone(), *pair.public())),
            (ClientKeys::Persistent(_), None) => Err(CryptError::failure("missing shared key")),
            (ClientKeys::Ephemeral { seed, nonce_pad }, _) => {
                let derivation_nonce: FullNonce = full_nonce(client_nonce, nonce_pad);
                let ephemeral = crypto::derive_ephemeral(seed.secret(), &derivation_nonce);
                let shared =
                    crypto::precompute(self.cipher, &self.provider_public_key, ephemeral.secret())?;
                Ok((shared, *ephemeral.public()))
            }
        }
    }

    /// Wraps a plaintext DNS message into a query envelope. The returned half
    /// nonce must be handed back to [`ClientSession::decrypt`].
    pub fn encrypt(&self, message: &[u8]) -> Result<(HalfNonce, Vec<u8>), CryptError> {
        let len = message.len();
        check_message_len(len)?;
        let max_len = (3 * (len + QUERY_OVERHEAD)).min(MAX_ENVELOPE_SIZE);

        let mut out = vec![0u8; max_len];
        out[QUERY_OVERHEAD..QUERY_OVERHEAD + len].copy_from_slice(message);
        let padded = pad(
            &mut out[QUERY_OVERHEAD..],
            len,
            max_len - QUERY_OVERHEAD - LENGTH_PREFIX_RESERVE,
            |bound| fastrand::usize(..bound),
        );

        let client_nonce = new_half_nonce();
        let nonce = full_nonce(&client_nonce, &[0u8; HALF_NONCE_LEN]);
        let (key, public_key) = self.message_key(&client_nonce)?;

        let mac = crypto::seal(
            self.cipher,
            &key,
            &nonce,
            &mut out[QUERY_OVERHEAD..QUERY_OVERHEAD + padded],
        )?;
        out[QUERY_HEADER_LEN..QUERY_OVERHEAD].copy_from_slice(&mac);
        QueryHeader {
            magic: self.magic_query,
            public_key,
            client_nonce,
        }
        .write_to(&mut out);

        out.truncate(QUERY_OVERHEAD + padded);
        Ok((client_nonce, out))
    }

    /// Opens a response envelope to the query sent with `expected_nonce`.
    pub fn decrypt(
        &self,
        expected_nonce: &HalfNonce,
        envelope: &[u8],
    ) -> Result<Vec<u8>, CryptError> {
        if envelope.len() <= RESPONSE_OVERHEAD {
            return Err(CryptError::failure("too short encrypted message"));
        }
        let header = ResponseHeader::read_from(envelope)
            .ok_or_else(|| CryptError::failure("too short encrypted message"))?;
        if header.magic != RESPONSE_MAGIC {
            return Err(CryptError::failure("message is not DNSCrypt"));
        }
        if &header.client_nonce != expected_nonce {
            return Err(CryptError::failure("wrong nonce"));
        }

        let (key, _) = self.message_key(&header.client_nonce)?;
        let mac = &envelope[RESPONSE_HEADER_LEN..RESPONSE_OVERHEAD];
        let mut plain = envelope[RESPONSE_OVERHEAD..].to_vec();
        crypto::open(self.cipher, &key, &header.full_nonce(), mac, &mut plain)?;

        let content_len = unpad(&plain, plain.len())?;
        if content_len < MIN_DNS_MESSAGE_LEN {
            return Err(CryptError::failure("decrypted message is not DNS"));
        }
        plain.truncate(content_len);
        Ok(plain)
    }
}
