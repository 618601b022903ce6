//! Resolver side of the channel: opening client queries and sealing the
//! responses with keyed padding.

use super::certificate::Certificate;
use super::crypto::{self, KeyPair, SharedKey};
use super::envelope::{
    self, check_message_len, full_nonce, HalfNonce, QueryHeader, ResponseHeader, HALF_NONCE_LEN,
    LENGTH_PREFIX_RESERVE, MAX_ENVELOPE_SIZE, MIN_DNS_MESSAGE_LEN, QUERY_HEADER_LEN,
    QUERY_OVERHEAD, RESPONSE_HEADER_LEN, RESPONSE_OVERHEAD,
};
use super::nonce::new_half_nonce;
use super::padding::{pad, unpad};
use ferrous_dnscrypt_domain::dnscrypt::PUBLIC_KEY_LEN;
use ferrous_dnscrypt_domain::{Cipher, CryptError};

/// Per-query state needed to encrypt the matching response.
#[derive(Debug, Clone)]
pub struct QuerySession {
    pub client_public_key: [u8; PUBLIC_KEY_LEN],
    pub client_nonce: HalfNonce,
    pub shared_key: SharedKey,
}

/// A query as seen by the serving pipeline. `session` is set when the
/// query arrived encrypted and the response must be encrypted too.
#[derive(Debug, Clone)]
pub struct DecryptedQuery {
    pub message: Vec<u8>,
    pub session: Option<QuerySession>,
}

impl DecryptedQuery {
    pub fn plain(message: Vec<u8>) -> Self {
        Self {
            message,
            session: None,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.session.is_some()
    }
}

/// Provider side of the DNSCrypt channel.
#[derive(Debug, Clone)]
pub struct ServerSession {
    keys: KeyPair,
    cipher: Cipher,
    certificate: Option<Certificate>,
}

impl ServerSession {
    pub fn new(keys: KeyPair, cipher: Cipher) -> Result<Self, CryptError> {
        if !cipher.is_defined() {
            return Err(CryptError::UndefinedCipher);
        }
        Ok(Self {
            keys,
            cipher,
            certificate: None,
        })
    }

    /// Serves `certificate`, whose encrypting key must be the public half of
    /// `keys`.
    pub fn with_certificate(keys: KeyPair, certificate: Certificate) -> Result<Self, CryptError> {
        if certificate.server_public_key() != keys.public() {
            return Err(CryptError::invalid_certificate(format!(
                "certificate key {} does not match the server key {}",
                certificate.encrypting_key_fingerprint(),
                ferrous_dnscrypt_domain::dnscrypt::fingerprint(keys.public())
            )));
        }
        let mut session = Self::new(keys, certificate.cipher())?;
        session.certificate = Some(certificate);
        Ok(session)
    }

    pub fn cipher(&self) -> Cipher {
        self.cipher
    }

    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        self.keys.public()
    }

    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    /// True when `bytes` carries the served certificate's query magic.
    pub fn is_dnscrypt_query(&self, bytes: &[u8]) -> bool {
        self.certificate
            .as_ref()
            .is_some_and(|cert| envelope::is_dnscrypt_query(cert.magic_query(), bytes))
    }

    pub fn decrypt(&self, query: &[u8]) -> Result<DecryptedQuery, CryptError> {
        if query.len() <= QUERY_OVERHEAD {
            return Err(CryptError::failure("too short message"));
        }
        let header = QueryHeader::read_from(query)
            .ok_or_else(|| CryptError::failure("too short message"))?;

        let shared_key = crypto::precompute(self.cipher, &header.public_key, self.keys.secret())?;
        let nonce = full_nonce(&header.client_nonce, &[0u8; HALF_NONCE_LEN]);
        let mac = &query[QUERY_HEADER_LEN..QUERY_OVERHEAD];
        let mut plain = query[QUERY_OVERHEAD..].to_vec();
        crypto::open(self.cipher, &shared_key, &nonce, mac, &mut plain)?;

        let content_len = unpad(&plain, plain.len())?;
        if content_len < MIN_DNS_MESSAGE_LEN {
            return Err(CryptError::failure("too short decrypted DNS message"));
        }
        plain.truncate(content_len);

        Ok(DecryptedQuery {
            message: plain,
            session: Some(QuerySession {
                client_public_key: header.public_key,
                client_nonce: header.client_nonce,
                shared_key,
            }),
        })
    }

    /// Wraps a response for the client that sent `session`'s query. The
    /// padding length is keyed on the client nonce and the server secret.
    pub fn encrypt(
        &self,
        session: &QuerySession,
        message: &[u8],
    ) -> Result<Vec<u8>, CryptError> {
        let len = message.len();
        check_message_len(len)?;
        let head = RESPONSE_OVERHEAD.max(QUERY_OVERHEAD);
        let budget = (3 * (len + head)).min(MAX_ENVELOPE_SIZE);

        let mut out = vec![0u8; RESPONSE_OVERHEAD + budget - head - LENGTH_PREFIX_RESERVE];
        out[RESPONSE_OVERHEAD..RESPONSE_OVERHEAD + len].copy_from_slice(message);
        let client_nonce = session.client_nonce;
        let secret = self.keys.secret();
        let padded = pad(
            &mut out[RESPONSE_OVERHEAD..],
            len,
            budget - head - LENGTH_PREFIX_RESERVE,
            |bound| crypto::keyed_uniform(&client_nonce, secret, bound),
        );

        let header = ResponseHeader::new(client_nonce, new_half_nonce());
        let mac = crypto::seal(
            self.cipher,
            &session.shared_key,
            &header.full_nonce(),
            &mut out[RESPONSE_OVERHEAD..RESPONSE_OVERHEAD + padded],
        )?;
        out[RESPONSE_HEADER_LEN..RESPONSE_OVERHEAD].copy_from_slice(&mac);
        header.write_to(&mut out);

        out.truncate(RESPONSE_OVERHEAD + padded);
        Ok(out)
    }
}
