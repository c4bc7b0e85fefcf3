use murmurhash3::murmurhash3_x86_32 as mmh3;
use rand::Rng;

/// A seedable 32-bit hash over byte keys.
///
/// The seed is fixed for the oracle's lifetime; re-seeding between updates
/// and queries would invalidate every estimate stored under the old seed.
pub struct HashOracle {
    seed: u32,
}

impl HashOracle {
    pub fn new(rng: &mut impl Rng) -> Self {
        HashOracle { seed: rng.random() }
    }

    pub fn with_seed(seed: u32) -> Self {
        HashOracle { seed }
    }

    pub fn run(&self, key: &[u8]) -> u32 {
        mmh3(key, self.seed)
    }
}
