pub mod fetcher;
pub mod registry;
pub mod service;

pub use fetcher::CertificateFetcher;
pub use registry::{ProviderRegistry, ProviderSlot, ReadyProviders, ReadySession};
pub use service::ProviderCertificateService;
