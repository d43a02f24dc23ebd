//! Deterministic per-ticker seeds.
//!
//! A master seed is expanded into one sub-seed per `(ticker, stream)` pair via
//! BLAKE3, so generated data does not depend on the order tickers are requested.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedHierarchy {
    master_seed: u64,
}

impl SeedHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Sub-seed for one ticker and stream index.
    pub fn sub_seed(&self, ticker: &str, stream: u64) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(ticker.as_bytes());
        hasher.update(&stream.to_le_bytes());
        *hasher.finalize().as_bytes()
    }

    pub fn rng_for(&self, ticker: &str, stream: u64) -> StdRng {
        StdRng::from_seed(self.sub_seed(ticker, stream))
    }
}
