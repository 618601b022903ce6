use super::dnscrypt::{DecryptedQuery, ServerSession};
use super::forwarding::CertificateTxtCodec;
use super::wire_response::{build_error_response, RCODE_SERVFAIL};
use ferrous_dnscrypt_application::use_cases::ForwardQueryUseCase;
use hickory_proto::op::Message;
use std::sync::Arc;
use tracing::{debug, warn};

/// Serving side: certificate answers, DNSCrypt envelopes and plaintext
/// queries all enter here and leave as wire bytes.
pub struct DnsCryptResponder {
    serving: Option<ServingIdentity>,
    forward: Arc<ForwardQueryUseCase>,
}

/// Name and keys this instance serves DNSCrypt under.
pub struct ServingIdentity {
    pub provider_name: String,
    pub session: ServerSession,
}

impl DnsCryptResponder {
    pub fn new(forward: Arc<ForwardQueryUseCase>) -> Self {
        Self {
            serving: None,
            forward,
        }
    }

    pub fn with_serving(mut self, provider_name: String, session: ServerSession) -> Self {
        self.serving = Some(ServingIdentity {
            provider_name,
            session,
        });
        self
    }

    pub fn is_serving(&self) -> bool {
        self.serving.is_some()
    }

    /// Returns the bytes to send back, or `None` when the packet is dropped.
    pub async fn handle(&self, packet: &[u8]) -> Option<Vec<u8>> {
        let query = self.open(packet)?;

        if query.session.is_none() {
            if let Some(answer) = self.certificate_answer(&query.message) {
                return Some(answer);
            }
        }

        let reply = match self.forward.execute(&query.message).await {
            Ok(reply) => reply,
            Err(e) => {
                debug!(error = %e, "Query resolution failed");
                build_error_response(&query.message, RCODE_SERVFAIL)?
            }
        };

        match (&query.session, &self.serving) {
            (Some(session), Some(serving)) => match serving.session.encrypt(session, &reply) {
                Ok(envelope) => Some(envelope),
                Err(e) => {
                    warn!(error = %e, "Failed to encrypt DNSCrypt response");
                    let servfail = build_error_response(&query.message, RCODE_SERVFAIL)?;
                    serving.session.encrypt(session, &servfail).ok()
                }
            },
            _ => Some(reply),
        }
    }

    fn open(&self, packet: &[u8]) -> Option<DecryptedQuery> {
        match &self.serving {
            Some(serving) if serving.session.is_dnscrypt_query(packet) => {
                match serving.session.decrypt(packet) {
                    Ok(query) => Some(query),
                    Err(e) => {
                        debug!(error = %e, bytes = packet.len(), "Dropping undecryptable query");
                        None
                    }
                }
            }
            _ => Some(DecryptedQuery::plain(packet.to_vec())),
        }
    }

    fn certificate_answer(&self, message: &[u8]) -> Option<Vec<u8>> {
        let serving = self.serving.as_ref()?;
        let certificate = serving.session.certificate()?;
        let query = Message::from_vec(message).ok()?;
        if !CertificateTxtCodec::is_certificate_request(&query, &serving.provider_name) {
            return None;
        }

        debug!(serial = certificate.serial(), "Answering certificate request");
        match CertificateTxtCodec::build_certificate_response(
            &query,
            &serving.provider_name,
            certificate.raw_signed(),
        ) {
            Ok(answer) => Some(answer),
            Err(e) => {
                warn!(error = %e, "Failed to build certificate answer");
                build_error_response(message, RCODE_SERVFAIL)
            }
        }
    }
}
