//! MinHash signatures over character shingles.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

const MERSENNE_PRIME: u64 = (1 << 61) - 1;
const MAX_HASH: u64 = (1 << 32) - 1;

/// A fixed family of `a*x + b mod p` permutations.
#[derive(Debug, Clone)]
pub struct MinHasher {
    perms: Vec<(u64, u64)>,
    shingle_size: usize,
}

/// One signature: the minimum permuted hash per permutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(pub Vec<u64>);

impl MinHasher {
    pub fn new(num_perm: usize, shingle_size: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let perms = (0..num_perm)
            .map(|_| {
                (
                    rng.gen_range(1..MERSENNE_PRIME),
                    rng.gen_range(0..MERSENNE_PRIME),
                )
            })
            .collect();
        Self {
            perms,
            shingle_size: shingle_size.max(1),
        }
    }

    pub fn num_perm(&self) -> usize {
        self.perms.len()
    }

    /// Signature of the lowercase `shingle_size`-character shingles of
    /// `text`. Text shorter than one shingle gets the empty signature
    /// (every slot at the maximum).
    pub fn signature(&self, text: &str) -> Signature {
        let mut slots = vec![MAX_HASH; self.perms.len()];
        let chars: Vec<char> = text.chars().flat_map(char::to_lowercase).collect();
        if chars.len() < self.shingle_size {
            return Signature(slots);
        }

        let mut buf = String::with_capacity(self.shingle_size * 4);
        for window in chars.windows(self.shingle_size) {
            buf.clear();
            buf.extend(window);
            let hv = shingle_hash(buf.as_bytes());
            for (slot, (a, b)) in slots.iter_mut().zip(&self.perms) {
                let permuted = permute(hv, *a, *b);
                if permuted < *slot {
                    *slot = permuted;
                }
            }
        }
        Signature(slots)
    }
}

impl Signature {
    /// Estimated Jaccard similarity of the underlying shingle sets.
    pub fn jaccard(&self, other: &Signature) -> f64 {
        if self.0.is_empty() || self.0.len() != other.0.len() {
            return 0.0;
        }
        let equal = self.0.iter().zip(&other.0).filter(|(a, b)| a == b).count();
        equal as f64 / self.0.len() as f64
    }
}

fn shingle_hash(bytes: &[u8]) -> u64 {
    let digest = Sha256::digest(bytes);
    u64::from(u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]))
}

fn permute(hv: u64, a: u64, b: u64) -> u64 {
    let wide = (u128::from(a) * u128::from(hv) + u128::from(b)) % u128::from(MERSENNE_PRIME);
    (wide as u64) & MAX_HASH
}
