//! ISO/IEC 7816-4 style padding: content, a `0x80` marker, then zeros up to
//! a 64-byte boundary plus a random number of extra bytes.

use ferrous_dnscrypt_domain::CryptError;

pub const MIN_PADDING: usize = 8;
pub const PADDING_BLOCK: usize = 64;
pub const PADDING_MARKER: u8 = 0x80;

/// Pads `buffer[..content_len]` in place and returns the padded length.
///
/// `random` receives an exclusive upper bound and must return a value below
/// it. When fewer than `MIN_PADDING` bytes fit under `max_len` the content
/// is left untouched and `content_len` is returned.
pub fn pad<F>(buffer: &mut [u8], content_len: usize, max_len: usize, random: F) -> usize
where
    F: FnOnce(usize) -> usize,
{
    let max_len = max_len.min(buffer.len());
    if max_len < content_len + MIN_PADDING {
        return content_len;
    }

    let extra = random(max_len - content_len - MIN_PADDING + 1);
    let mut padded_len = content_len + MIN_PADDING + extra;
    padded_len += PADDING_BLOCK - padded_len % PADDING_BLOCK;
    padded_len = padded_len.min(max_len);

    buffer[content_len] = PADDING_MARKER;
    buffer[content_len + 1..padded_len].fill(0);
    padded_len
}

/// Recovers the content length of `buffer[..total_len]`.
pub fn unpad(buffer: &[u8], total_len: usize) -> Result<usize, CryptError> {
    let data = &buffer[..total_len.min(buffer.len())];
    match data.iter().rposition(|&b| b != 0) {
        Some(end) if data[end] == PADDING_MARKER => Ok(end),
        _ => Err(CryptError::failure("no end")),
    }
}
