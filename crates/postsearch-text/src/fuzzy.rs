//! Bounded edit distance for typo tolerance.
//!
//! Uses optimal string alignment: insertions, deletions, substitutions and
//! adjacent transpositions each cost one edit, so "audoi" is one edit from
//! "audio". Distances are counted in chars, not bytes.

/// Edit budget for a query token of `token_len` chars.
pub fn max_edits(token_len: usize, fraction: f32, cap: usize) -> usize {
    let budget = (token_len as f32 * fraction).round();
    if budget <= 0.0 {
        0
    } else {
        (budget as usize).min(cap)
    }
}

/// Is `b` within `max` edits of `a`?
///
/// Two early exits: a length difference above `max` is a lower bound on the
/// distance, and once a whole DP row exceeds `max` no later cell can recover.
pub fn within_edits(a: &str, b: &str, max: usize) -> bool {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len().abs_diff(b.len()) > max {
        return false;
    }
    if max == 0 {
        return a == b;
    }

    let n = b.len();
    let mut before_prev = vec![0usize; n + 1];
    let mut prev: Vec<usize> = (0..=n).collect();
    let mut cur = vec![0usize; n + 1];

    for i in 1..=a.len() {
        cur[0] = i;
        let mut row_min = cur[0];
        for j in 1..=n {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut d = (prev[j] + 1).min(cur[j - 1] + 1).min(prev[j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                d = d.min(before_prev[j - 2] + 1);
            }
            cur[j] = d;
            row_min = row_min.min(d);
        }
        if row_min > max {
            return false;
        }
        std::mem::swap(&mut before_prev, &mut prev);
        std::mem::swap(&mut prev, &mut cur);
    }

    prev[n] <= max
}
