//! Banded locality-sensitive hashing over MinHash signatures.

use std::collections::{BTreeSet, HashMap};

use crate::minhash::Signature;

/// Numeric integration steps for the band layout search.
const INTEGRATION_STEPS: usize = 200;

/// Pick `(bands, rows)` with `bands * rows <= num_perm` minimising the
/// equally weighted false positive and false negative probability mass
/// around `threshold`.
pub fn optimal_bands(threshold: f64, num_perm: usize) -> (usize, usize) {
    let mut best = (1, num_perm.max(1));
    let mut min_error = f64::INFINITY;
    for b in 1..=num_perm {
        for r in 1..=(num_perm / b) {
            let candidate = |s: f64| 1.0 - (1.0 - s.powi(r as i32)).powi(b as i32);
            let fp = integrate(&candidate, 0.0, threshold);
            let fn_ = integrate(|s| 1.0 - candidate(s), threshold, 1.0);
            let error = 0.5 * fp + 0.5 * fn_;
            if error < min_error {
                min_error = error;
                best = (b, r);
            }
        }
    }
    best
}

/// Composite Simpson's rule.
fn integrate(f: impl Fn(f64) -> f64, a: f64, b: f64) -> f64 {
    if b <= a {
        return 0.0;
    }
    let n = INTEGRATION_STEPS;
    let h = (b - a) / n as f64;
    let mut sum = f(a) + f(b);
    for i in 1..n {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * f(a + i as f64 * h);
    }
    sum * h / 3.0
}

/// Maps band keys to the positions of the signatures inserted under them.
#[derive(Debug, Clone)]
pub struct LshIndex {
    bands: usize,
    rows: usize,
    tables: Vec<HashMap<Vec<u64>, Vec<usize>>>,
    len: usize,
}

impl LshIndex {
    pub fn new(threshold: f64, num_perm: usize) -> Self {
        let (bands, rows) = optimal_bands(threshold, num_perm);
        Self {
            bands,
            rows,
            tables: vec![HashMap::new(); bands],
            len: 0,
        }
    }

    pub fn layout(&self) -> (usize, usize) {
        (self.bands, self.rows)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a signature; returns its position.
    pub fn insert(&mut self, signature: &Signature) -> usize {
        let position = self.len;
        for (band, table) in self.tables.iter_mut().enumerate() {
            let key = band_key(signature, band, self.rows);
            table.entry(key).or_default().push(position);
        }
        self.len += 1;
        position
    }

    /// Positions sharing at least one band with `signature`, in
    /// insertion order.
    pub fn query(&self, signature: &Signature) -> Vec<usize> {
        let mut hits = BTreeSet::new();
        for (band, table) in self.tables.iter().enumerate() {
            if let Some(positions) = table.get(&band_key(signature, band, self.rows)) {
                hits.extend(positions.iter().copied());
            }
        }
        hits.into_iter().collect()
    }
}

fn band_key(signature: &Signature, band: usize, rows: usize) -> Vec<u64> {
    let start = (band * rows).min(signature.0.len());
    let end = (start + rows).min(signature.0.len());
    signature.0[start..end].to_vec()
}
