use crate::dns::dnscrypt::{
    load_keypair, select_preferred, Certificate, ClientKeys, ClientSession,
};
use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use ferrous_dnscrypt_domain::config::{write_resolver_list, DnsCryptConfig, ProviderEntry};
use ferrous_dnscrypt_domain::{DnsCryptProvider, DomainError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Certificate in force for a provider and the client codec configured
/// from it.
#[derive(Debug)]
pub struct ReadySession {
    pub certificate: Certificate,
    pub session: ClientSession,
}

/// One provider in the arena.
#[derive(Debug)]
pub struct ProviderSlot {
    provider: DnsCryptProvider,
    keys: ClientKeys,
    ready: ArcSwapOption<ReadySession>,
}

impl ProviderSlot {
    fn new(provider: DnsCryptProvider, keys: ClientKeys) -> Self {
        Self {
            provider,
            keys,
            ready: ArcSwapOption::empty(),
        }
    }

    pub fn provider(&self) -> &DnsCryptProvider {
        &self.provider
    }

    pub fn ready(&self) -> Option<Arc<ReadySession>> {
        self.ready.load_full()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load().is_some()
    }
}

/// On-disk list of providers that currently hold a valid certificate.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ReadyProviders {
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,
}

/// Arena of configured DNSCrypt providers, keyed by `ip:port`.
///
/// Refresh jobs and forwarders hold ids, never references into the arena.
pub struct ProviderRegistry {
    slots: DashMap<String, Arc<ProviderSlot>>,
    order: Vec<String>,
}

impl ProviderRegistry {
    /// Builds the arena. `keys` is called once per provider.
    pub fn new<F>(providers: Vec<DnsCryptProvider>, mut keys: F) -> Self
    where
        F: FnMut() -> ClientKeys,
    {
        let slots = DashMap::with_capacity(providers.len());
        let mut order = Vec::with_capacity(providers.len());
        for provider in providers {
            let id = provider.id();
            if slots.contains_key(&id) {
                continue;
            }
            order.push(id.clone());
            slots.insert(id, Arc::new(ProviderSlot::new(provider, keys())));
        }
        Self { slots, order }
    }

    /// Resolves `[[dnscrypt.providers]]` and the client identity. Each
    /// provider gets its own ephemeral seed unless a persistent keypair is
    /// configured.
    pub fn from_config(config: &DnsCryptConfig) -> Result<Self, DomainError> {
        let providers = config
            .resolve_providers()
            .map_err(|e| DomainError::ConfigError(e.to_string()))?;

        let persistent = match (
            &config.client_public_key_file,
            &config.client_secret_key_file,
        ) {
            (Some(public), Some(secret)) => Some(load_keypair(public, secret)?),
            _ => None,
        };

        let registry = match persistent {
            Some(pair) => {
                info!("Using a persistent client key pair");
                Self::new(providers, || ClientKeys::persistent(pair.clone()))
            }
            None if config.ephemeral_keys => Self::new(providers, ClientKeys::ephemeral),
            None => {
                info!("Generating a new session key pair");
                let pair = crate::dns::dnscrypt::KeyPair::generate();
                Self::new(providers, || ClientKeys::persistent(pair.clone()))
            }
        };

        info!(providers = registry.len(), "DNSCrypt providers loaded");
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn get(&self, id: &str) -> Option<Arc<ProviderSlot>> {
        self.slots.get(id).map(|slot| Arc::clone(slot.value()))
    }

    fn slot(&self, id: &str) -> Result<Arc<ProviderSlot>, DomainError> {
        self.get(id)
            .ok_or_else(|| DomainError::ProviderNotFound(id.to_string()))
    }

    /// Selects the preferred valid candidate and swaps in a client session
    /// built from it. On failure the previously installed session, if any,
    /// stays in place.
    pub fn install_certificate(
        &self,
        id: &str,
        candidates: &[Vec<u8>],
        now: u32,
    ) -> Result<Arc<ReadySession>, DomainError> {
        let slot = self.slot(id)?;
        let certificate = select_preferred(&slot.provider.signing_key, candidates, now)?;

        let session = match slot.ready() {
            Some(current) if current.certificate == certificate => {
                debug!(provider = %id, serial = certificate.serial(), "Certificate unchanged");
                return Ok(current);
            }
            Some(current) => {
                let mut session = current.session.clone();
                session.reconfigure(&certificate)?;
                session
            }
            None => ClientSession::new(slot.keys.clone(), &certificate)?,
        };

        certificate.log_info();
        certificate.check_rotation_period();

        let ready = Arc::new(ReadySession {
            certificate,
            session,
        });
        slot.ready.store(Some(Arc::clone(&ready)));
        info!(
            provider = %id,
            name = %slot.provider.name,
            serial = ready.certificate.serial(),
            cipher = %ready.certificate.cipher(),
            "DNSCrypt provider ready"
        );
        Ok(ready)
    }

    pub fn mark_unready(&self, id: &str) -> Result<(), DomainError> {
        self.slot(id)?.ready.store(None);
        Ok(())
    }

    pub fn ready_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_ready()).count()
    }

    /// A uniformly random provider that currently has a session.
    pub fn select_random_ready(&self) -> Option<(Arc<ProviderSlot>, Arc<ReadySession>)> {
        let ready: Vec<(Arc<ProviderSlot>, Arc<ReadySession>)> = self
            .order
            .iter()
            .filter_map(|id| self.get(id))
            .filter_map(|slot| slot.ready().map(|session| (slot, session)))
            .collect();
        if ready.is_empty() {
            return None;
        }
        let pick = fastrand::usize(..ready.len());
        ready.into_iter().nth(pick)
    }

    /// Ready providers, in configuration order.
    pub fn snapshot_ready(&self) -> Vec<DnsCryptProvider> {
        self.order
            .iter()
            .filter_map(|id| self.get(id))
            .filter(|slot| slot.is_ready())
            .map(|slot| slot.provider.clone())
            .collect()
    }

    /// Writes the ready providers to `path`: a resolver list when the file
    /// ends in `.csv`, TOML otherwise.
    pub fn save_ready_providers(&self, path: &str) -> Result<usize, DomainError> {
        let ready = self.snapshot_ready();
        let contents = if is_csv_path(path) {
            let mut buf = Vec::new();
            write_resolver_list(&mut buf, &ready)
                .map_err(|e| DomainError::ConfigError(e.to_string()))?;
            buf
        } else {
            let list = ReadyProviders {
                providers: ready.iter().map(ProviderEntry::from).collect(),
            };
            toml::to_string_pretty(&list)
                .map_err(|e| {
                    DomainError::ConfigError(format!("Failed to serialize ready providers: {}", e))
                })?
                .into_bytes()
        };
        std::fs::write(path, contents)
            .map_err(|e| DomainError::IoError(format!("{}: {}", path, e)))?;
        Ok(ready.len())
    }
}

fn is_csv_path(path: &str) -> bool {
    std::path::Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}
