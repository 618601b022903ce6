pub mod dnscrypt;
pub mod forwarding;
pub mod providers;
pub mod server;
pub mod transport;
pub mod wire_response;

pub use dnscrypt::{Certificate, ClientKeys, ClientSession, KeyPair, ServerSession};
pub use forwarding::{CertificateTxtCodec, DnsCryptForwarder, PlainForwarder};
pub use providers::{CertificateFetcher, ProviderCertificateService, ProviderRegistry};
pub use server::DnsCryptResponder;
