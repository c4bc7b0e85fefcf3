use log::debug;

/// How a sketch gives memory back when asked to shrink.
///
/// The flat variants destructively fold adjacent buckets in place; the
/// hierarchical variant keeps every coarser resolution materialized from the
/// start and compression only repoints queries at one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressMethod {
    FlatSumMerge,
    FlatMaxMerge,
    Hierarchical,
}

/// Counter storage shared by both sketch estimators: `D` independently
/// hashed rows of signed 32-bit buckets.
///
/// Geometry invariant: `w == 2^k`. A flat row is one array of length `w`.
/// A hierarchical row holds levels `l` in `[1, k-1]`, level `l` having
/// `w >> l` buckets, every level updated directly so it stays exact at its
/// own resolution.
pub struct SketchTable<const D: usize> {
    w: usize,
    k: u32,
    /// Active resolution for hierarchical reads; starts at the finest level.
    r: u32,
    method: CompressMethod,
    rows: [Vec<Vec<i32>>; D],
}

impl<const D: usize> SketchTable<D> {
    /// Derives the widest table fitting `mem_in_bytes`: the largest power of
    /// two with `w <= mem / (4 * D * 2)` (4-byte counters, split across `D`
    /// rows, factor 2 headroom). Budgets too small for `w = 2` degenerate to
    /// a single bucket per row rather than failing.
    pub fn new(mem_in_bytes: usize, method: CompressMethod) -> Self {
        let budget = mem_in_bytes / 4 / D / 2;
        let mut w = 1usize;
        let mut k = 0u32;
        while w * 2 <= budget {
            w *= 2;
            k += 1;
        }

        let rows = std::array::from_fn(|_| match method {
            CompressMethod::Hierarchical => {
                (1..k).map(|l| vec![0i32; w >> l]).collect()
            }
            _ => vec![vec![0i32; w]],
        });

        debug!("SketchTable: w = {w}, k = {k}, d = {D}, method = {method:?}");
        SketchTable {
            w,
            k,
            r: 1,
            method,
            rows,
        }
    }

    /// Bucket index at resolution `level`: the top `k - level` bits of the
    /// hash. Coarser levels drop low-order index bits, so keys colliding at a
    /// fine level collide at every coarser one.
    fn bucket(k: u32, hash: u32, level: u32) -> usize {
        let bits = k - level;
        if bits == 0 {
            0
        } else {
            (hash >> (32 - bits)) as usize
        }
    }

    /// Adds `delta` to the bucket `hash` selects in `row` (every level in
    /// hierarchical mode).
    pub fn update(&mut self, row: usize, hash: u32, delta: i32) {
        let k = self.k;
        match self.method {
            CompressMethod::Hierarchical => {
                for l in 1..k {
                    let idx = Self::bucket(k, hash, l);
                    self.rows[row][(l - 1) as usize][idx] += delta;
                }
            }
            _ => {
                let idx = Self::bucket(k, hash, 0);
                self.rows[row][0][idx] += delta;
            }
        }
    }

    /// Reads the counter `hash` selects in `row` at the active resolution.
    pub fn read(&self, row: usize, hash: u32) -> i32 {
        match self.method {
            CompressMethod::Hierarchical => {
                if self.k < 2 {
                    // degenerate budget: no levels were materialized
                    return 0;
                }
                let idx = Self::bucket(self.k, hash, self.r);
                self.rows[row][(self.r - 1) as usize][idx]
            }
            _ => self.rows[row][0][Self::bucket(self.k, hash, 0)],
        }
    }

    /// Halves the table `rate` times.
    ///
    /// Flat modes fold each run of `2^rate` adjacent buckets into one (sum or
    /// elementwise max) and shrink the rows in place; finer resolution is
    /// gone for good. Hierarchical mode advances the resolution pointer and
    /// touches no counters.
    ///
    /// Panics if `rate` is zero or would exhaust the remaining resolution.
    pub fn compress(&mut self, rate: u32) {
        assert!(rate >= 1, "compress rate must be at least 1");
        match self.method {
            CompressMethod::Hierarchical => {
                assert!(
                    self.k >= 2 && self.r + rate < self.k,
                    "compression rate exceeds available resolution"
                );
                self.r += rate;
                debug!("SketchTable: repointed to level {}", self.r);
            }
            _ => {
                assert!(
                    rate <= self.k,
                    "compression rate exceeds available resolution"
                );
                self.w >>= rate;
                self.k -= rate;
                let run = 1usize << rate;
                for row in self.rows.iter_mut() {
                    let buckets = &mut row[0];
                    for j in 0..self.w {
                        let base = j * run;
                        let mut folded = 0i32;
                        for l in 0..run {
                            folded = match self.method {
                                CompressMethod::FlatSumMerge => folded + buckets[base + l],
                                CompressMethod::FlatMaxMerge => folded.max(buckets[base + l]),
                                CompressMethod::Hierarchical => unreachable!(),
                            };
                        }
                        buckets[j] = folded;
                    }
                    buckets.truncate(self.w);
                }
                debug!("SketchTable: merged down to w = {}, k = {}", self.w, self.k);
            }
        }
    }

    /// Synthetic footprint in cost units (index bits plus fixed per-row
    /// overhead), for relative comparison across configurations only.
    pub fn memory_use(&self) -> u32 {
        match self.method {
            CompressMethod::Hierarchical => self.k.saturating_sub(self.r) + 4,
            _ => self.k + 4,
        }
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn index_bits(&self) -> u32 {
        self.k
    }

    pub fn resolution(&self) -> u32 {
        self.r
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // 512 bytes / 4 / 4 rows / 2 = 16 buckets per row
    const MEM_FOR_W16: usize = 512;

    #[test]
    fn width_is_largest_power_of_two_within_budget() {
        let t = SketchTable::<4>::new(MEM_FOR_W16, CompressMethod::FlatSumMerge);
        assert_eq!(t.width(), 16);
        assert_eq!(t.index_bits(), 4);

        // one byte short of the next doubling stays at 16
        let t = SketchTable::<4>::new(1023, CompressMethod::FlatSumMerge);
        assert_eq!(t.width(), 16);
        let t = SketchTable::<4>::new(1024, CompressMethod::FlatSumMerge);
        assert_eq!(t.width(), 32);
    }

    #[test]
    fn undersized_budget_degenerates_to_single_bucket() {
        let mut t = SketchTable::<4>::new(0, CompressMethod::FlatSumMerge);
        assert_eq!(t.width(), 1);
        assert_eq!(t.index_bits(), 0);
        // every hash lands in the lone bucket
        t.update(0, 0xdead_beef, 1);
        t.update(0, 0x0000_0001, 1);
        assert_eq!(t.read(0, 0xffff_ffff), 2);
    }

    #[test]
    fn bucket_index_uses_top_bits() {
        let mut t = SketchTable::<1>::new(128, CompressMethod::FlatSumMerge);
        assert_eq!(t.index_bits(), 4);
        // top nibble 0b0001 -> bucket 1
        t.update(0, 0x1fff_ffff, 7);
        assert_eq!(t.read(0, 0x1000_0000), 7);
        assert_eq!(t.read(0, 0x2000_0000), 0);
    }

    #[test]
    fn flat_sum_merge_folds_adjacent_buckets() {
        let mut t = SketchTable::<4>::new(MEM_FOR_W16, CompressMethod::FlatSumMerge);
        // buckets 0 and 1 of row 0 via crafted hashes (top 4 bits 0000 / 0001)
        for _ in 0..3 {
            t.update(0, 0x0000_0000, 1);
        }
        for _ in 0..5 {
            t.update(0, 0x1000_0000, 1);
        }
        t.compress(1);
        assert_eq!(t.width(), 8);
        // both hashes now select the merged bucket
        assert_eq!(t.read(0, 0x0000_0000), 8);
        assert_eq!(t.read(0, 0x1000_0000), 8);
    }

    #[test]
    fn flat_max_merge_keeps_run_maximum() {
        let mut t = SketchTable::<4>::new(MEM_FOR_W16, CompressMethod::FlatMaxMerge);
        t.update(0, 0x0000_0000, 3);
        t.update(0, 0x1000_0000, 5);
        t.compress(1);
        assert_eq!(t.read(0, 0x0000_0000), 5);
    }

    #[test]
    fn multi_level_compress_folds_wider_runs() {
        let mut t = SketchTable::<4>::new(MEM_FOR_W16, CompressMethod::FlatSumMerge);
        // one hit in each of buckets 0..4
        for top in 0u32..4 {
            t.update(0, top << 28, 1);
        }
        t.compress(2);
        assert_eq!(t.width(), 4);
        assert_eq!(t.read(0, 0x0000_0000), 4);
    }

    #[test]
    fn hierarchical_levels_are_updated_independently() {
        let mut t = SketchTable::<4>::new(MEM_FOR_W16, CompressMethod::Hierarchical);
        assert_eq!(t.index_bits(), 4);
        // top bits 000 vs 001: distinct at level 1, same bucket at level 2
        t.update(0, 0x0000_0000, 3);
        t.update(0, 0x2000_0000, 5);
        assert_eq!(t.resolution(), 1);
        assert_eq!(t.read(0, 0x0000_0000), 3);
        assert_eq!(t.read(0, 0x2000_0000), 5);

        t.compress(1);
        assert_eq!(t.resolution(), 2);
        // reads the independently maintained level-2 counter, not a refold
        assert_eq!(t.read(0, 0x0000_0000), 8);
        assert_eq!(t.read(0, 0x2000_0000), 8);
    }

    #[test]
    fn hierarchical_compress_moves_no_data() {
        let mut a = SketchTable::<2>::new(4096, CompressMethod::Hierarchical);
        let mut b = SketchTable::<2>::new(4096, CompressMethod::Hierarchical);
        for h in [0x0123_4567u32, 0x89ab_cdef, 0xfedc_ba98] {
            a.update(0, h, 1);
            b.update(0, h, 1);
        }
        b.compress(2);
        a.compress(1);
        a.compress(1);
        // reaching level 3 in one step or two reads the same counters
        for h in [0x0123_4567u32, 0x89ab_cdef, 0xfedc_ba98, 0x5555_5555] {
            assert_eq!(a.read(0, h), b.read(0, h));
        }
    }

    #[test]
    fn memory_use_decreases_with_compression() {
        let mut flat = SketchTable::<4>::new(MEM_FOR_W16, CompressMethod::FlatSumMerge);
        let before = flat.memory_use();
        assert_eq!(before, 8);
        flat.compress(1);
        assert_eq!(flat.memory_use(), 7);

        let mut hier = SketchTable::<4>::new(MEM_FOR_W16, CompressMethod::Hierarchical);
        let before = hier.memory_use();
        assert_eq!(before, 7);
        hier.compress(1);
        assert_eq!(hier.memory_use(), 6);
    }

    #[test]
    #[should_panic(expected = "compress rate must be at least 1")]
    fn zero_rate_is_rejected() {
        let mut t = SketchTable::<4>::new(MEM_FOR_W16, CompressMethod::FlatSumMerge);
        t.compress(0);
    }

    #[test]
    #[should_panic(expected = "compression rate exceeds available resolution")]
    fn flat_compress_past_one_bucket_is_rejected() {
        let mut t = SketchTable::<4>::new(MEM_FOR_W16, CompressMethod::FlatSumMerge);
        t.compress(5);
    }

    #[test]
    #[should_panic(expected = "compression rate exceeds available resolution")]
    fn hierarchical_compress_past_coarsest_level_is_rejected() {
        let mut t = SketchTable::<4>::new(MEM_FOR_W16, CompressMethod::Hierarchical);
        // k = 4, levels 1..=3: r may advance to 3 but no further
        t.compress(3);
    }

    #[test]
    fn hierarchical_compress_to_coarsest_level_is_allowed() {
        let mut t = SketchTable::<4>::new(MEM_FOR_W16, CompressMethod::Hierarchical);
        t.compress(2);
        assert_eq!(t.resolution(), 3);
    }

    #[test]
    #[should_panic(expected = "compression rate exceeds available resolution")]
    fn degenerate_hierarchical_table_cannot_compress() {
        let mut t = SketchTable::<4>::new(0, CompressMethod::Hierarchical);
        t.update(0, 0x1234_5678, 1); // no levels: a no-op
        assert_eq!(t.read(0, 0x1234_5678), 0);
        t.compress(1);
    }
}
