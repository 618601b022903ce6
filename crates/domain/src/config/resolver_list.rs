//! Public DNSCrypt resolver list in CSV form (`dnscrypt-resolvers.csv`).
//!
//! Columns are matched by header name and any column not listed below is
//! ignored. The ready-provider list written back uses the three columns a
//! reader needs: address, provider name and provider public key.

use super::dnscrypt::ProviderEntry;
use super::errors::ConfigError;
use crate::dnscrypt::{fingerprint, DnsCryptProvider};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Bounds on the header row of a resolver list.
pub const MIN_COLUMNS: usize = 3;
pub const MAX_COLUMNS: usize = 50;

#[derive(Debug, Deserialize)]
struct ResolverRow {
    #[serde(rename = "Name", default)]
    name: Option<String>,

    #[serde(rename = "Provider name", default)]
    provider_name: String,

    #[serde(rename = "Provider public key", default)]
    public_key: String,

    #[serde(rename = "Resolver address", default)]
    address: String,

    #[serde(rename = "DNSSEC validation", default)]
    dnssec: Option<String>,

    #[serde(rename = "No logs", default)]
    no_logs: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReadyRow<'a> {
    #[serde(rename = "Resolver address")]
    address: String,

    #[serde(rename = "Provider name")]
    provider_name: &'a str,

    #[serde(rename = "Provider public key")]
    public_key: String,
}

impl ResolverRow {
    fn into_entry(self, line: u64) -> Result<ProviderEntry, ConfigError> {
        let provider_name = self.provider_name.trim().to_string();
        if provider_name.is_empty() {
            return Err(ConfigError::ResolverList(format!(
                "line {}: missing a provider name",
                line
            )));
        }
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| provider_name.clone());
        if self.public_key.trim().is_empty() {
            return Err(ConfigError::ResolverList(format!(
                "line {}: public key is missing for [{}]",
                line, name
            )));
        }
        if self.address.trim().is_empty() {
            return Err(ConfigError::ResolverList(format!(
                "line {}: resolver address is missing for [{}]",
                line, name
            )));
        }

        // DNSSEC is assumed unless the list says otherwise; logging only
        // when the list says "no" to "No logs".
        let dnssec = self
            .dnssec
            .as_deref()
            .map_or(true, |v| v.trim().eq_ignore_ascii_case("yes"));
        let logs = self
            .no_logs
            .as_deref()
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("no"));

        Ok(ProviderEntry {
            name,
            provider_name,
            public_key: self.public_key.trim().to_string(),
            address: self.address.trim().to_string(),
            tcp_only: false,
            dnssec,
            no_logs: !logs,
        })
    }
}

/// Parses a resolver list and resolves each row into a provider.
pub fn read_resolver_list<R: Read>(reader: R) -> Result<Vec<DnsCryptProvider>, ConfigError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let columns = reader
        .headers()
        .map_err(|e| ConfigError::ResolverList(e.to_string()))?
        .len();
    if !(MIN_COLUMNS..=MAX_COLUMNS).contains(&columns) {
        return Err(ConfigError::ResolverList(format!(
            "invalid number of columns: {}",
            columns
        )));
    }

    let mut providers = Vec::new();
    for row in reader.deserialize::<ResolverRow>() {
        let row = row.map_err(|e| ConfigError::ResolverList(e.to_string()))?;
        // Header is line 1; data rows follow.
        let line = providers.len() as u64 + 2;
        providers.push(row.into_entry(line)?.to_provider()?);
    }
    Ok(providers)
}

pub fn load_resolver_list(path: &str) -> Result<Vec<DnsCryptProvider>, ConfigError> {
    let file = std::fs::File::open(path)
        .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
    read_resolver_list(file)
}

/// Writes `providers` with the `Resolver address,Provider name,Provider
/// public key` header.
pub fn write_resolver_list<W: Write>(
    writer: W,
    providers: &[DnsCryptProvider],
) -> Result<(), ConfigError> {
    let mut writer = csv::Writer::from_writer(writer);
    for provider in providers {
        writer
            .serialize(ReadyRow {
                address: provider.address.to_string(),
                provider_name: &provider.provider_name,
                public_key: fingerprint(&provider.signing_key),
            })
            .map_err(|e| ConfigError::ResolverList(e.to_string()))?;
    }
    if providers.is_empty() {
        writer
            .write_record(["Resolver address", "Provider name", "Provider public key"])
            .map_err(|e| ConfigError::ResolverList(e.to_string()))?;
    }
    writer
        .flush()
        .map_err(|e| ConfigError::ResolverList(e.to_string()))
}
