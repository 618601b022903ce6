use ferrous_dnscrypt_application::use_cases::ForwardQueryUseCase;
use ferrous_dnscrypt_domain::config::DnsCryptServerConfig;
use ferrous_dnscrypt_domain::Config;
use ferrous_dnscrypt_infrastructure::dns::dnscrypt::{
    load_certificate_file, load_key_file, KeyPair, ServerSession,
};
use ferrous_dnscrypt_infrastructure::dns::{
    DnsCryptForwarder, DnsCryptResponder, PlainForwarder, ProviderCertificateService,
    ProviderRegistry,
};
use ferrous_dnscrypt_jobs::{CertificateRefreshJob, JobRunner, ProviderStatusJob};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct DnsServices {
    pub registry: Arc<ProviderRegistry>,
    pub certificates: Arc<ProviderCertificateService>,
    pub responder: Arc<DnsCryptResponder>,
}

impl DnsServices {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        info!("Initializing DNSCrypt services");

        let registry = Arc::new(ProviderRegistry::from_config(&config.dnscrypt)?);
        let timeout = Duration::from_millis(config.dnscrypt.query_timeout_ms);
        let certificates = Arc::new(ProviderCertificateService::new(
            Arc::clone(&registry),
            timeout,
        ));

        let forward = Arc::new(Self::build_forwarding(config, &registry, timeout)?);
        let mut responder = DnsCryptResponder::new(forward);
        if let Some(serving) = &config.dnscrypt.server {
            let session = Self::load_serving_session(serving)?;
            responder = responder.with_serving(serving.provider_name.clone(), session);
        }

        Ok(Self {
            registry,
            certificates,
            responder: Arc::new(responder),
        })
    }

    fn build_forwarding(
        config: &Config,
        registry: &Arc<ProviderRegistry>,
        timeout: Duration,
    ) -> anyhow::Result<ForwardQueryUseCase> {
        let mut use_case = ForwardQueryUseCase::new();

        if !registry.is_empty() {
            use_case = use_case.with_encrypted(Arc::new(DnsCryptForwarder::new(
                Arc::clone(registry),
                timeout,
            )));
        }

        if config.upstream.servers.is_empty() {
            warn!("No plain upstream configured, queries fail until a provider is ready");
        } else {
            let plain = PlainForwarder::from_config(&config.upstream)?;
            info!(
                servers = config.upstream.servers.len(),
                protocol = %config.upstream.protocol,
                "Plain upstream fallback enabled"
            );
            use_case = use_case.with_plain(Arc::new(plain));
        }

        Ok(use_case)
    }

    fn load_serving_session(serving: &DnsCryptServerConfig) -> anyhow::Result<ServerSession> {
        let signing_key = load_key_file(&serving.public_key_file)?;
        let keys = KeyPair::from_secret(load_key_file(&serving.secret_key_file)?);
        let certificate = load_certificate_file(&serving.certificate_file, &signing_key)?;
        certificate.log_info();
        certificate.check_rotation_period();

        let session = ServerSession::with_certificate(keys, certificate)?;
        info!(
            provider_name = %serving.provider_name,
            cipher = %session.cipher(),
            "Serving DNSCrypt"
        );
        Ok(session)
    }

    pub fn job_runner(&self, config: &Config, shutdown: CancellationToken) -> JobRunner {
        let mut runner = JobRunner::new().with_shutdown_token(shutdown);
        if !self.registry.is_empty() {
            runner = runner
                .with_certificate_refresh(CertificateRefreshJob::new(self.certificates.clone()))
                .with_provider_status(
                    ProviderStatusJob::new(self.certificates.clone())
                        .with_interval(config.dnscrypt.status_interval_secs)
                        .with_ready_providers_file(config.dnscrypt.ready_providers_file.clone()),
                );
        }
        runner
    }
}
