use rand::{rngs::StdRng, Rng, SeedableRng};

use sketch_bench::{cm_sketch::CMSketch, count_sketch::CountSketch, log, table::CompressMethod};

const KEY_LEN: usize = 13;

fn main() {
    log::init_logger();

    let mut cm: CMSketch<KEY_LEN> = CMSketch::new(65536, CompressMethod::FlatSumMerge);
    let mut cs: CountSketch<KEY_LEN> = CountSketch::new(65536, CompressMethod::Hierarchical);

    // skewed synthetic stream: key i appears i + 1 times
    let mut rng = StdRng::seed_from_u64(0xABCD);
    let keys: Vec<[u8; KEY_LEN]> = (0..64).map(|_| rng.random()).collect();
    for (i, key) in keys.iter().enumerate() {
        for _ in 0..=i {
            cm.insert(key);
            cs.insert(key);
        }
    }

    let hot = &keys[63];
    println!(
        "{}: estimate = {} (true 64), cost = {}",
        cm.name(),
        cm.query(hot),
        cm.memory_use()
    );
    println!(
        "{}: estimate = {} (true 64), cost = {}",
        cs.name(),
        cs.query(hot),
        cs.memory_use()
    );

    cm.compress(1);
    cs.compress(1);
    println!(
        "{}: after compress(1): estimate = {}, cost = {}",
        cm.name(),
        cm.query(hot),
        cm.memory_use()
    );
    println!(
        "{}: after compress(1): estimate = {}, cost = {}",
        cs.name(),
        cs.query(hot),
        cs.memory_use()
    );
}
