use rand::Rng;

use crate::hash::HashOracle;
use crate::table::{CompressMethod, SketchTable};

/// Count-min sketch: a one-sided frequency estimator.
///
/// Each of the `D` rows hashes the key with its own oracle and bumps one
/// bucket. Collisions can only inflate a counter, never deflate it, so the
/// minimum across rows is the tightest upper bound available and the estimate
/// never falls below the true count.
///
/// `KEY_LEN` fixes the key length in bytes; keys of any other length are
/// rejected.
pub struct CMSketch<const KEY_LEN: usize, const D: usize = 4> {
    table: SketchTable<D>,
    hash: [HashOracle; D],
    name: String,
}

impl<const KEY_LEN: usize, const D: usize> CMSketch<KEY_LEN, D> {
    /// Builds a sketch sized for `mem_in_bytes`, seeding each row's oracle
    /// from the thread RNG.
    pub fn new(mem_in_bytes: usize, method: CompressMethod) -> Self {
        Self::with_rng(mem_in_bytes, method, &mut rand::rng())
    }

    pub fn with_rng(mem_in_bytes: usize, method: CompressMethod, rng: &mut impl Rng) -> Self {
        let seeds = std::array::from_fn(|_| rng.random());
        Self::with_seeds(mem_in_bytes, method, seeds)
    }

    /// Deterministic construction from explicit per-row seeds.
    pub fn with_seeds(mem_in_bytes: usize, method: CompressMethod, seeds: [u32; D]) -> Self {
        CMSketch {
            table: SketchTable::new(mem_in_bytes, method),
            hash: seeds.map(HashOracle::with_seed),
            name: format!("CMSketch@{mem_in_bytes}"),
        }
    }

    fn check_key(key: &[u8]) {
        assert_eq!(
            key.len(),
            KEY_LEN,
            "key length mismatch: expected {} bytes, got {}",
            KEY_LEN,
            key.len()
        );
    }

    pub fn insert(&mut self, key: &[u8]) {
        Self::check_key(key);
        for i in 0..D {
            self.table.update(i, self.hash[i].run(key), 1);
        }
    }

    /// Estimated frequency of `key`: minimum counter across the rows at the
    /// active resolution.
    pub fn query(&self, key: &[u8]) -> u32 {
        Self::check_key(key);
        let mut ans = i32::MAX;
        for i in 0..D {
            ans = ans.min(self.table.read(i, self.hash[i].run(key)));
        }
        ans.max(0) as u32
    }

    /// Shrinks the table by `rate` halvings; see [`SketchTable::compress`].
    pub fn compress(&mut self, rate: u32) {
        self.table.compress(rate);
    }

    pub fn memory_use(&self) -> u32 {
        self.table.memory_use()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
