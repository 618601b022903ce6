//! DNSCrypt secure channel: certificates, envelopes and the client and
//! server session codecs.

pub mod certificate;
pub mod client;
pub mod crypto;
pub mod envelope;
pub mod keys;
pub mod nonce;
pub mod padding;
pub mod server;

pub use certificate::{select_preferred, unix_now, CertVersion, Certificate};
pub use client::{ClientKeys, ClientSession};
pub use crypto::{KeyPair, SharedKey};
pub use envelope::{HalfNonce, RESPONSE_MAGIC};
pub use keys::{load_certificate_file, load_key_file, load_keypair};
pub use server::{DecryptedQuery, QuerySession, ServerSession};
