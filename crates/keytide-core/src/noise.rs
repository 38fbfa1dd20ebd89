//! Deterministic noise source for humanizing timing and velocity.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default seed used when none is configured.
pub const DEFAULT_SEED: u64 = 0x6b65_7974_6964_6531;

/// Seeded pseudo-random generator. The same seed replays the same sequence.
#[derive(Debug, Clone)]
pub struct Noise {
    rng: StdRng,
    seed: u64,
}

impl Noise {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Restart the sequence from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
        self.seed = seed;
    }

    /// Raw 7-bit value in `[0, 127]`.
    #[inline]
    pub fn byte(&mut self) -> u8 {
        self.rng.gen_range(0..=127)
    }

    /// Uniform value in `[0, factor]`. A factor of 0 always yields 0.
    ///
    /// Factors are expressed on a 128 scale: `noise8(128)` spans a full unit
    /// of the fixed-point quantity it perturbs.
    #[inline]
    pub fn noise8(&mut self, factor: u32) -> u32 {
        if factor == 0 {
            return 0;
        }
        self.rng.gen_range(0..=factor)
    }
}

impl Default for Noise {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}
