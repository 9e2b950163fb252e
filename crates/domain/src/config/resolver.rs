use serde::{Deserialize, Serialize};

/// Employee name resolution (MinHash + LSH) tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "d_num_perm")]
    pub num_perm: usize,
    #[serde(default = "d_shingle_size")]
    pub shingle_size: usize,
    /// Jaccard threshold the LSH band layout is tuned for. Kept loose so
    /// recall wins; rescoring filters the noise.
    #[serde(default = "d_threshold")]
    pub threshold: f64,
    #[serde(default = "d_max_results")]
    pub max_results: usize,
    /// Seed for the permutation functions. Signatures are only
    /// comparable between indexes built with the same seed.
    #[serde(default = "d_seed")]
    pub seed: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            num_perm: d_num_perm(),
            shingle_size: d_shingle_size(),
            threshold: d_threshold(),
            max_results: d_max_results(),
            seed: d_seed(),
        }
    }
}

fn d_num_perm() -> usize {
    64
}
fn d_shingle_size() -> usize {
    3
}
fn d_threshold() -> f64 {
    0.1
}
fn d_max_results() -> usize {
    10
}
fn d_seed() -> u64 {
    1
}
