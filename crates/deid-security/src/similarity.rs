//! Normalized Indel similarity.

/// Similarity of two strings on a 0–100 scale.
///
/// `100 * (1 - indel / (|a| + |b|))`, where `indel = |a| + |b| - 2 * lcs(a, b)`
/// counts the insertions and deletions needed to turn one string into the
/// other. Lengths are in characters. Two empty strings score 100.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    let lcs = lcs_len(&a, &b);
    let indel = total - 2 * lcs;
    100.0 * (1.0 - indel as f64 / total as f64)
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
