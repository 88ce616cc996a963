//! MinHash signatures for Jaccard similarity estimation over shingle sets.

use std::collections::HashSet;

use serde::Serialize;

/// 2^61 - 1, the modulus of the universal hash family.
const MERSENNE_61: u64 = (1 << 61) - 1;

/// Stable 64-bit FNV-1a. `std`'s `DefaultHasher` is not stable across releases,
/// and signatures are rebuilt on warm start.
pub(crate) fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x00000100000001B3;
    let mut state = OFFSET;
    for &b in bytes {
        state ^= b as u64;
        state = state.wrapping_mul(PRIME);
    }
    state
}

/// Generates fixed-size MinHash signatures.
///
/// Each of the `num_hashes` functions is `h_i(x) = (a_i * x + b_i) mod (2^61 - 1)`
/// applied to the FNV-1a hash of a shingle.
#[derive(Debug, Clone)]
pub struct MinHasher {
    coefficients: Vec<(u64, u64)>,
}

impl MinHasher {
    pub fn new(num_hashes: usize) -> Self {
        Self::with_seed(num_hashes, 42)
    }

    /// Deterministic for a given seed, so signatures are comparable across restarts.
    pub fn with_seed(num_hashes: usize, seed: u64) -> Self {
        let mut rng_state = seed;
        let mut next = || {
            rng_state = rng_state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            rng_state >> 3
        };
        let coefficients = (0..num_hashes)
            .map(|_| {
                let a = next() % (MERSENNE_61 - 1) + 1;
                let b = next() % MERSENNE_61;
                (a, b)
            })
            .collect();
        Self { coefficients }
    }

    /// Computes the signature of a shingle set. The empty set yields the
    /// degenerate (empty) signature.
    pub fn signature(&self, shingles: &HashSet<String>) -> Signature {
        if shingles.is_empty() {
            return Signature::empty();
        }
        let mut mins = vec![u64::MAX; self.coefficients.len()];
        for shingle in shingles {
            let x = fnv1a64(shingle.as_bytes()) % MERSENNE_61;
            for (slot, &(a, b)) in mins.iter_mut().zip(self.coefficients.iter()) {
                let h = permute(a, b, x);
                if h < *slot {
                    *slot = h;
                }
            }
        }
        Signature { values: mins }
    }
}

fn permute(a: u64, b: u64, x: u64) -> u64 {
    ((a as u128 * x as u128 + b as u128) % MERSENNE_61 as u128) as u64
}

/// A MinHash signature. Empty when the source document had no shingles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
    values: Vec<u64>,
}

impl Signature {
    pub fn empty() -> Self {
        Self { values: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Estimated Jaccard similarity: the fraction of positions holding equal minima.
    /// Degenerate or mismatched signatures compare as 0.0.
    pub fn jaccard(&self, other: &Self) -> f64 {
        if self.len() != other.len() || self.is_empty() {
            return 0.0;
        }
        let matches = self
            .values
            .iter()
            .zip(other.values.iter())
            .filter(|(a, b)| a == b)
            .count();
        matches as f64 / self.values.len() as f64
    }

    /// One stable hash per band of `rows` consecutive values.
    pub fn band_hashes(&self, bands: usize) -> Vec<u64> {
        if self.values.is_empty() || bands == 0 {
            return Vec::new();
        }
        let rows = (self.values.len() / bands).max(1);
        self.values
            .chunks(rows)
            .take(bands)
            .enumerate()
            .map(|(band_idx, chunk)| {
                let mut bytes = Vec::with_capacity(8 * (chunk.len() + 1));
                bytes.extend_from_slice(&(band_idx as u64).to_le_bytes());
                for v in chunk {
                    bytes.extend_from_slice(&v.to_le_bytes());
                }
                fnv1a64(&bytes)
            })
            .collect()
    }
}
