//! Deterministic string-keyed randomness
//!
//! Every spawn decision in the world flows through `luck`. The same key
//! yields the same value in every process, on every target - nothing here
//! touches wall-clock time, platform entropy, or shared counters.
//!
//! Construction: BLAKE3 digest of the key seeds a PCG stream, and one
//! 53-bit draw is normalized into [0, 1).

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg32;

/// Map an arbitrary key to a reproducible value in [0, 1)
pub fn luck(key: &str) -> f64 {
    let digest = blake3::hash(key.as_bytes());
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest.as_bytes()[..8]);

    let mut rng = Pcg32::seed_from_u64(u64::from_le_bytes(seed));
    ((rng.next_u64() >> 11) as f64) * (1.0 / (1u64 << 53) as f64)
}

/// `luck` over an independent stream for the same key
///
/// Salting keeps the spawn gate and the coin-count roll for one cell
/// uncorrelated.
pub fn luck_salted(key: &str, salt: &str) -> f64 {
    luck(&format!("{key}#{salt}"))
}
