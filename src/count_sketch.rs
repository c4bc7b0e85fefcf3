use rand::Rng;

use crate::hash::HashOracle;
use crate::table::{CompressMethod, SketchTable};

/// Count sketch: a two-sided, sign-corrected frequency estimator.
///
/// Alongside the bucket oracle, every row carries a second oracle whose low
/// bit gives the key a per-row polarity (+1 or -1). Updates add the signed
/// polarity; queries sign-correct each row's counter and take the median, so
/// collision noise from keys of opposing polarity cancels around the true
/// count instead of only inflating it. Estimates are floored at 1 since the
/// sketch reports frequencies of keys that were seen.
pub struct CountSketch<const KEY_LEN: usize, const D: usize = 4> {
    table: SketchTable<D>,
    hash: [HashOracle; D],
    hash_polar: [HashOracle; D],
    name: String,
}

impl<const KEY_LEN: usize, const D: usize> CountSketch<KEY_LEN, D> {
    pub fn new(mem_in_bytes: usize, method: CompressMethod) -> Self {
        Self::with_rng(mem_in_bytes, method, &mut rand::rng())
    }

    pub fn with_rng(mem_in_bytes: usize, method: CompressMethod, rng: &mut impl Rng) -> Self {
        let seeds = std::array::from_fn(|_| rng.random());
        let polar_seeds = std::array::from_fn(|_| rng.random());
        Self::with_seeds(mem_in_bytes, method, seeds, polar_seeds)
    }

    /// Deterministic construction: `seeds` drive bucket selection,
    /// `polar_seeds` drive per-row polarity. The two sets must be independent
    /// for the sign correction to cancel noise.
    pub fn with_seeds(
        mem_in_bytes: usize,
        method: CompressMethod,
        seeds: [u32; D],
        polar_seeds: [u32; D],
    ) -> Self {
        CountSketch {
            table: SketchTable::new(mem_in_bytes, method),
            hash: seeds.map(HashOracle::with_seed),
            hash_polar: polar_seeds.map(HashOracle::with_seed),
            name: format!("CountSketch@{mem_in_bytes}"),
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

    fn polarity(&self, row: usize, key: &[u8]) -> i32 {
        if self.hash_polar[row].run(key) % 2 == 1 {
            1
        } else {
            -1
        }
    }

    pub fn insert(&mut self, key: &[u8]) {
        Self::check_key(key);
        for i in 0..D {
            let delta = self.polarity(i, key);
            self.table.update(i, self.hash[i].run(key), delta);
        }
    }

    /// Estimated frequency of `key`: the median of the sign-corrected row
    /// counters (for even `D`, the integer mean of the two central values),
    /// floored at 1.
    pub fn query(&self, key: &[u8]) -> u32 {
        Self::check_key(key);
        let mut ans = [0i32; D];
        for i in 0..D {
            let val = self.table.read(i, self.hash[i].run(key));
            ans[i] = if self.polarity(i, key) == 1 { val } else { -val };
        }
        ans.sort_unstable();

        let median = if D % 2 == 0 {
            (ans[D / 2] + ans[D / 2 - 1]) / 2
        } else {
            ans[D / 2]
        };
        median.max(1) as u32
    }

    /// Shrinks the table by `rate` halvings; see [`SketchTable::compress`].
    /// Max-merging signed counters is kept for parity with the one-sided
    /// sketch even though it discards sign structure.
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
