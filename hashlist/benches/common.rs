use hashlist::{DigestIndex, IndexOptions};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Generates a sorted list of `count` random digests of `digest_len` bytes.
/// Uses a fixed seed for reproducible benchmark results.
pub fn generate_sorted_digests(count: usize, digest_len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut raw = vec![0u8; count * digest_len];
    rng.fill_bytes(&mut raw);
    DigestIndex::from_unsorted(raw, digest_len, IndexOptions::default())
        .expect("generated buffer is a whole number of records")
        .records()
        .to_vec()
}

/// Generates random probes, almost all of which miss.
pub fn generate_probes(count: usize, digest_len: usize) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..count)
        .map(|_| {
            let mut probe = vec![0u8; digest_len];
            rng.fill_bytes(&mut probe);
            probe
        })
        .collect()
}
