#![allow(dead_code)]
pub mod certificates;
pub mod dns_server_mock;
pub mod forwarders;

pub use certificates::{query_message, CertificateBuilder, SigningIdentity};
pub use dns_server_mock::MockDnsCryptServer;
pub use forwarders::StaticForwarder;
