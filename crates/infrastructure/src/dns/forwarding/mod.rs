pub mod dnscrypt_forwarder;
pub mod plain_forwarder;
pub mod txt_codec;

pub use dnscrypt_forwarder::DnsCryptForwarder;
pub use plain_forwarder::PlainForwarder;
pub use txt_codec::CertificateTxtCodec;
