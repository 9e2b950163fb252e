//! Weighted, token-order-insensitive string similarity on a 0–100 scale.
//!
//! Combines a plain edit ratio, a best-window partial ratio and two
//! token-based ratios, scaled down when the inputs differ a lot in
//! length. Inputs are lowercased and stripped of punctuation first.

use std::collections::BTreeSet;

const UNBASE_SCALE: f64 = 0.95;

/// Similarity of two names, 0 (unrelated) to 100 (equivalent).
pub fn weighted_ratio(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (la, lb) = (a.len() as f64, b.len() as f64);
    let len_ratio = la.max(lb) / la.min(lb);
    let base = ratio(&a, &b);

    if len_ratio < 1.5 {
        return base.max(token_ratio(&a, &b) * UNBASE_SCALE);
    }

    let partial_scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
    let best = base.max(partial_ratio(&a, &b) * partial_scale);
    best.max(partial_token_ratio(&a, &b) * UNBASE_SCALE * partial_scale)
}

/// Lowercase; every non-alphanumeric character becomes a space; trimmed.
fn normalize(s: &str) -> Vec<char> {
    let mapped: String = s
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    mapped.trim().chars().collect()
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                cur[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Insertion/deletion similarity.
fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    100.0 * (2 * lcs_len(a, b)) as f64 / total as f64
}

/// Best `ratio` of the shorter string against any same-length window of
/// the longer one, including windows clipped at either end.
fn partial_ratio(a: &[char], b: &[char]) -> f64 {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let m = short.len();
    if m == 0 {
        return 0.0;
    }

    let mut best = 0.0f64;
    for k in 1..m {
        best = best.max(ratio(short, &long[..k]));
        best = best.max(ratio(short, &long[long.len() - k..]));
    }
    for start in 0..=(long.len() - m) {
        best = best.max(ratio(short, &long[start..start + m]));
        if best >= 100.0 {
            break;
        }
    }
    best
}

fn tokens(s: &[char]) -> BTreeSet<String> {
    s.iter()
        .collect::<String>()
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

fn sorted_tokens(s: &[char]) -> Vec<char> {
    let mut parts: Vec<String> = s
        .iter()
        .collect::<String>()
        .split_whitespace()
        .map(str::to_owned)
        .collect();
    parts.sort();
    parts.join(" ").chars().collect()
}

fn joined(set: &BTreeSet<&String>) -> Vec<char> {
    set.iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .collect()
}

fn token_sort_ratio(a: &[char], b: &[char]) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

fn token_set_ratio(a: &[char], b: &[char]) -> f64 {
    let ta = tokens(a);
    let tb = tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }

    let sect: BTreeSet<&String> = ta.intersection(&tb).collect();
    let diff_ab: BTreeSet<&String> = ta.difference(&tb).collect();
    let diff_ba: BTreeSet<&String> = tb.difference(&ta).collect();

    if !sect.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100.0;
    }

    let sect = joined(&sect);
    let ab = joined(&diff_ab);
    let ba = joined(&diff_ba);

    let sep = usize::from(!sect.is_empty());
    let sect_ab_len = sect.len() + sep + ab.len();
    let sect_ba_len = sect.len() + sep + ba.len();

    let diff_dist = ab.len() + ba.len() - 2 * lcs_len(&ab, &ba);
    let mut best = norm_similarity(diff_dist, sect_ab_len + sect_ba_len);
    if sect.is_empty() {
        return best;
    }

    best = best.max(norm_similarity(sep + ab.len(), sect.len() + sect_ab_len));
    best.max(norm_similarity(sep + ba.len(), sect.len() + sect_ba_len))
}

fn norm_similarity(dist: usize, lensum: usize) -> f64 {
    if lensum == 0 {
        return 0.0;
    }
    100.0 - 100.0 * dist as f64 / lensum as f64
}

fn token_ratio(a: &[char], b: &[char]) -> f64 {
    token_sort_ratio(a, b).max(token_set_ratio(a, b))
}

fn partial_token_ratio(a: &[char], b: &[char]) -> f64 {
    let ta = tokens(a);
    let tb = tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    if ta.intersection(&tb).next().is_some() {
        return 100.0;
    }
    partial_ratio(&sorted_tokens(a), &sorted_tokens(b))
}
