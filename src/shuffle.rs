/// shuffle.rs — Deterministic slot permutation
///
/// The permutation PRNG is a wire-format commitment, not an
/// implementation detail: embed and extract derive their slot order
/// independently, from different files, and must produce bit-identical
/// shuffles from the same seed. The crate pins ChaCha8 (rand_chacha's
/// `ChaCha8Rng`) and records the choice in every key file under the
/// `prng` field. Changing the algorithm, the seeding rule, or the
/// shuffle loop breaks compatibility with existing stego files.
///
/// Seeding rules:
///   key-derived shuffle   — `seed_from_u64` of the first 8 key bytes
///                           interpreted as a big-endian u64
///   partition split       — 32-byte ChaCha8 seed with the 16 seed
///                           bytes in positions 0..16, zeros after
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Name recorded in key files. Readers reject anything else.
pub const PRNG_NAME: &str = "chacha8";

/// Length of the deniable partition seed in bytes.
pub const PARTITION_SEED_LEN: usize = 16;

/// PRNG for a key-derived shuffle. Same key bytes → same stream.
pub fn rng_from_key(key: &[u8]) -> ChaCha8Rng {
    let mut seed8 = [0u8; 8];
    let n = key.len().min(8);
    seed8[..n].copy_from_slice(&key[..n]);
    ChaCha8Rng::seed_from_u64(u64::from_be_bytes(seed8))
}

/// PRNG for the deniable partition split. Same seed → same split.
pub fn rng_from_partition_seed(seed: &[u8; PARTITION_SEED_LEN]) -> ChaCha8Rng {
    let mut full = [0u8; 32];
    full[..PARTITION_SEED_LEN].copy_from_slice(seed);
    ChaCha8Rng::from_seed(full)
}

/// In-place Fisher–Yates shuffle driven by the given PRNG.
///
/// The loop shape — `j = next_u64() % (i + 1)` from the top index down
/// — is part of the wire format along with the PRNG itself.
pub fn shuffle<T>(items: &mut [T], rng: &mut ChaCha8Rng) {
    for i in (1..items.len()).rev() {
        let j = (rng.next_u64() as usize) % (i + 1);
        items.swap(i, j);
    }
}

/// Deterministically split indices into two disjoint halves.
///
/// The full list is shuffled with the partition-seeded PRNG and cut at
/// `len / 2`. Every input index lands in exactly one half, so a bit
/// written through one half can never overwrite the other payload.
pub fn split_halves(
    mut indices: Vec<usize>,
    partition_seed: &[u8; PARTITION_SEED_LEN],
) -> (Vec<usize>, Vec<usize>) {
    let mut rng = rng_from_partition_seed(partition_seed);
    shuffle(&mut indices, &mut rng);
    let tail = indices.split_off(indices.len() / 2);
    (indices, tail)
}
