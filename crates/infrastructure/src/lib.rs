//! Ferrous DNSCrypt Infrastructure Layer
pub mod dns;
