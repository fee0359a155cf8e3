//! Deterministic random number generation.
//!
//! RULE: Nothing that influences model output may call a platform RNG.
//! All such randomness flows through SplitRng instances derived from
//! the single master seed recorded on the run row. (Run identifiers
//! are plain v4 uuids; they never feed back into training.)
//!
//! Each consumer gets its own stream, seeded deterministically from
//! (master_seed XOR stream_index). This means:
//!   - Adding a new stream never changes existing streams.
//!   - Each stream is fully reproducible in isolation.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// Stable stream index assignments.
/// NEVER reorder or remove entries — only append.
/// Reordering changes every stream's seed.
pub const SPLIT_STREAM: u64 = 0;

/// A deterministic RNG stream for a single consumer.
pub struct SplitRng {
    inner: Pcg64Mcg,
}

impl SplitRng {
    /// Create a stream from the master seed and a stable stream index.
    /// The index must never change once assigned.
    pub fn new(master_seed: u64, stream_index: u64) -> Self {
        let derived_seed = master_seed ^ (stream_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Fisher-Yates shuffle, in place. Same seed, same order, every run.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_u64_below(i as u64 + 1) as usize;
            items.swap(i, j);
        }
    }
}
