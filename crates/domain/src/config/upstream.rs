use serde::{Deserialize, Serialize};

/// Plain DNS servers used when no DNSCrypt provider is ready, and by the
/// serving side to resolve decrypted queries.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub servers: Vec<String>,

    #[serde(default = "default_protocol")]
    pub protocol: String,

    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            servers: vec!["9.9.9.9:53".to_string(), "1.1.1.1:53".to_string()],
            protocol: default_protocol(),
            query_timeout_ms: default_query_timeout_ms(),
        }
    }
}

fn default_protocol() -> String {
    "udp".to_string()
}

fn default_query_timeout_ms() -> u64 {
    3000
}
