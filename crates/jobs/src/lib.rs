pub mod certificate_refresh;
pub mod provider_status;
pub mod runner;

pub use certificate_refresh::{CertificateRefreshJob, RefreshPhase, RefreshState, TickAction};
pub use provider_status::ProviderStatusJob;
pub use runner::JobRunner;
