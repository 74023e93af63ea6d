//! Deterministic random streams.
//!
//! Every stream is a `Pcg32` seeded from BLAKE3 over the compile seed and a
//! list of salts, so a section occurrence or track always sees the same
//! sequence regardless of which thread expands it.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use etherdaw_spec::derive_seed;

/// Creates a deterministic RNG from a seed and salt parts.
pub fn rng_for(seed: u32, parts: &[&str]) -> Pcg32 {
    Pcg32::seed_from_u64(derive_seed(seed, parts))
}

/// RNG for one track within one arrangement occurrence of a section.
pub fn track_rng(seed: u32, arrangement_index: usize, section: &str, track: &str) -> Pcg32 {
    let index = arrangement_index.to_string();
    rng_for(seed, &["track", &index, section, track])
}

/// RNG for standalone expansion of a named pattern.
pub fn pattern_rng(seed: u32, pattern: &str) -> Pcg32 {
    rng_for(seed, &["pattern", pattern])
}

/// Uniform draw in `[-amount, amount]`; zero without consuming randomness
/// when `amount` is not positive.
pub fn jitter(rng: &mut Pcg32, amount: f64) -> f64 {
    if amount > 0.0 {
        rng.gen_range(-amount..=amount)
    } else {
        0.0
    }
}

/// Uniform draw in `[0, 1)`.
pub fn unit(rng: &mut Pcg32) -> f64 {
    rng.gen::<f64>()
}
