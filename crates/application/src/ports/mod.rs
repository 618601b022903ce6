mod certificate_refresh_port;
mod provider_status_port;
mod query_forwarder;

pub use certificate_refresh_port::{CertificateRefreshPort, InstalledCertificate};
pub use provider_status_port::{ProviderStatus, ProviderStatusPort};
pub use query_forwarder::QueryForwarder;
