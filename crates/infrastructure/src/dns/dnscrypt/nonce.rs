//! Client half nonces: a time-ordered prefix followed by random bytes.

use super::envelope::{HalfNonce, HALF_NONCE_LEN};
use rand::RngCore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Wall-clock microseconds at process start, paired with a monotonic
/// instant so later readings never step backwards.
static CLOCK_ANCHOR: LazyLock<(Instant, u64)> = LazyLock::new(|| {
    let wall = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64;
    (Instant::now(), wall)
});

static LAST_PREFIX: AtomicU64 = AtomicU64::new(0);

fn monotonic_micros() -> u64 {
    let (start, wall) = *CLOCK_ANCHOR;
    wall.saturating_add(start.elapsed().as_micros() as u64)
}

/// Time-ordered prefix: microseconds shifted left by 10 with 10 random low
/// bits. Strictly increasing within the process.
fn next_prefix(random_low: u64) -> u64 {
    let candidate = (monotonic_micros() << 10) | (random_low & 0x3ff);
    let mut last = LAST_PREFIX.load(Ordering::Relaxed);
    loop {
        let next = candidate.max(last.wrapping_add(1));
        match LAST_PREFIX.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(current) => last = current,
        }
    }
}

/// Fresh 12-byte half nonce: 8 bytes of little-endian time prefix followed
/// by 4 random bytes.
pub fn new_half_nonce() -> HalfNonce {
    let mut rng = rand::thread_rng();
    let prefix = next_prefix(rng.next_u64());

    let mut nonce = [0u8; HALF_NONCE_LEN];
    nonce[..8].copy_from_slice(&prefix.to_le_bytes());
    rng.fill_bytes(&mut nonce[8..]);
    nonce
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonces_are_unique_and_increasing() {
        let mut previous = 0u64;
        for _ in 0..1000 {
            let nonce = new_half_nonce();
            let mut prefix = [0u8; 8];
            prefix.copy_from_slice(&nonce[..8]);
            let prefix = u64::from_le_bytes(prefix);
            assert!(prefix > previous);
            previous = prefix;
        }
    }

    #[test]
    fn test_prefix_tracks_wall_clock() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_micros() as u64;
        let prefix = next_prefix(0);
        let micros = prefix >> 10;
        assert!(micros + 5_000_000 > now);
    }
}
