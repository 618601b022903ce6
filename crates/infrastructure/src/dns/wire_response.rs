/// RCODE 2.
pub const RCODE_SERVFAIL: u8 = 2;
/// RCODE 1.
pub const RCODE_FORMERR: u8 = 1;

const HEADER_LEN: usize = 12;

/// Offset just past the question section of a single-question query, or
/// `None` when the name runs off the buffer or uses compression.
fn question_end(query: &[u8]) -> Option<usize> {
    let mut pos = HEADER_LEN;
    loop {
        let label_len = *query.get(pos)? as usize;
        if label_len & 0xC0 != 0 {
            return None;
        }
        pos += 1;
        if label_len == 0 {
            break;
        }
        pos += label_len;
    }
    let end = pos + 4;
    (end <= query.len()).then_some(end)
}

/// Builds an error response straight from the query bytes, echoing the id,
/// opcode, RD bit and the question when there is exactly one.
///
/// Returns `None` for anything shorter than a DNS header.
pub fn build_error_response(query: &[u8], rcode: u8) -> Option<Vec<u8>> {
    if query.len() < HEADER_LEN {
        return None;
    }

    let qdcount = u16::from_be_bytes([query[4], query[5]]);
    let question = if qdcount == 1 {
        question_end(query)
    } else {
        None
    };
    let end = question.unwrap_or(HEADER_LEN);

    let mut buf = Vec::with_capacity(end);
    buf.extend_from_slice(&query[..end]);
    // QR=1, keep opcode and RD
    buf[2] = 0x80 | (query[2] & 0x79);
    // RA=1
    buf[3] = 0x80 | (rcode & 0x0F);
    buf[4] = 0x00;
    buf[5] = u8::from(question.is_some());
    buf[6..12].fill(0);
    Some(buf)
}
