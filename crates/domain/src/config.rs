pub mod dnscrypt;
pub mod errors;
pub mod logging;
pub mod resolver_list;
pub mod root;
pub mod server;
pub mod upstream;

pub use dnscrypt::{DnsCryptConfig, DnsCryptServerConfig, ProviderEntry};
pub use errors::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use resolver_list::{load_resolver_list, read_resolver_list, write_resolver_list};
pub use root::{CliOverrides, Config};
pub use server::ServerConfig;
pub use upstream::UpstreamConfig;
