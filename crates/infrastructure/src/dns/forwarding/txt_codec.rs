//! Certificate discovery over DNS TXT records.
//!
//! Providers publish each signed certificate as the TXT data of their
//! provider name. Clients query it, the serving side answers it.

use ferrous_dnscrypt_domain::DomainError;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::TXT;
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use std::str::FromStr;

/// TTL of served certificate answers.
pub const CERTIFICATE_TTL: u32 = 60;

/// Longest TXT character-string.
const MAX_TXT_STRING_LEN: usize = 255;

pub struct CertificateTxtCodec;

impl CertificateTxtCodec {
    /// Builds a recursive IN TXT query for `provider_name`.
    pub fn build_query(provider_name: &str) -> Result<(u16, Vec<u8>), DomainError> {
        let name = parse_name(provider_name)?;

        let mut query = Query::new();
        query.set_name(name);
        query.set_query_type(RecordType::TXT);
        query.set_query_class(DNSClass::IN);

        let id = fastrand::u16(..);
        let mut message = Message::new(id, MessageType::Query, OpCode::Query);
        message.set_recursion_desired(true);
        message.add_query(query);

        Ok((id, serialize(&message)?))
    }

    /// Concatenated character-strings of every IN TXT answer, one blob per
    /// record.
    pub fn extract_certificates(response: &[u8]) -> Result<Vec<Vec<u8>>, DomainError> {
        let message = Message::from_vec(response).map_err(|e| {
            DomainError::InvalidDnsResponse(format!("Failed to parse TXT response: {}", e))
        })?;
        if message.response_code() != ResponseCode::NoError {
            return Err(DomainError::InvalidDnsResponse(format!(
                "Certificate query answered with {}",
                message.response_code()
            )));
        }

        Ok(message
            .answers()
            .iter()
            .filter(|record| record.dns_class() == DNSClass::IN)
            .filter_map(|record| match record.data() {
                RData::TXT(txt) => Some(txt.txt_data().concat()),
                _ => None,
            })
            .collect())
    }

    /// True when `query` asks for the TXT record of `provider_name`.
    pub fn is_certificate_request(query: &Message, provider_name: &str) -> bool {
        let wanted = normalize(provider_name);
        query.message_type() == MessageType::Query
            && query.queries().iter().any(|q| {
                q.query_type() == RecordType::TXT && normalize(&q.name().to_ascii()) == wanted
            })
    }

    /// Answers a certificate request with `certificate` as TXT data, split
    /// into 255-byte character-strings.
    pub fn build_certificate_response(
        query: &Message,
        provider_name: &str,
        certificate: &[u8],
    ) -> Result<Vec<u8>, DomainError> {
        let name = parse_name(provider_name)?;
        let strings: Vec<&[u8]> = certificate.chunks(MAX_TXT_STRING_LEN).collect();
        let txt = TXT::from_bytes(strings);

        let mut response = Message::new(query.id(), MessageType::Response, query.op_code());
        response.set_recursion_desired(query.recursion_desired());
        response.set_recursion_available(true);
        response.set_authoritative(true);
        response.set_response_code(ResponseCode::NoError);
        for q in query.queries() {
            response.add_query(q.clone());
        }
        response.add_answer(Record::from_rdata(name, CERTIFICATE_TTL, RData::TXT(txt)));

        serialize(&response)
    }
}

fn parse_name(name: &str) -> Result<Name, DomainError> {
    Name::from_str(name).map_err(|e| {
        DomainError::InvalidDomainName(format!("Invalid provider name '{}': {}", name, e))
    })
}

fn normalize(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

pub(crate) fn serialize(message: &Message) -> Result<Vec<u8>, DomainError> {
    let mut buf = Vec::with_capacity(512);
    let mut encoder = BinEncoder::new(&mut buf);
    message.emit(&mut encoder).map_err(|e| {
        DomainError::InvalidDnsResponse(format!("Failed to serialize DNS message: {}", e))
    })?;
    Ok(buf)
}
