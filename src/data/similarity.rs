//! Fuzzy string similarity scores in `[0, 100]`.
//!
//! Both scores are built on the indel distance (insertions and deletions
//! only), expressed through the longest common subsequence:
//!
//! ```text
//! ratio(a, b) = 200 * LCS(a, b) / (|a| + |b|)
//! ```
//!
//! `partial_ratio` slides the shorter string over the longer one and keeps
//! the best `ratio`, so a term still scores high when the cell contains it
//! with extra text around it or when either side is truncated.
//!
//! # Time Complexity
//! `ratio`: O(m × n). `partial_ratio`: O(m × n × (n + m)) where m is the
//! shorter length; cell values and search terms are short.
//!
//! Lengths count Unicode scalar values, and comparison is case-sensitive.

/// Length of the longest common subsequence, two-row DP.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(a, b) as f64 / total as f64
}

/// Normalized indel similarity of two whole strings.
///
/// ```
/// use fuzzy_cleanse::data::similarity::ratio;
///
/// assert_eq!(ratio("hello", "hello"), 100.0);
/// assert_eq!(ratio("", ""), 100.0);
/// assert!(ratio("kitten", "sitting") < 70.0);
/// ```
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

/// Best alignment of `needle` against windows of `haystack`.
///
/// Windows are every slice of `haystack` with the needle's length, plus the
/// shorter prefixes and suffixes of `haystack` so a needle hanging over either
/// end is still scored.
fn best_window(needle: &[char], haystack: &[char]) -> f64 {
    let n = needle.len();
    let m = haystack.len();
    let mut best: f64 = 0.0;

    let windows = (1..n)
        .map(move |end| &haystack[..end])
        .chain((0..=m - n).map(move |start| &haystack[start..start + n]))
        .chain((m - n + 1..m).map(move |start| &haystack[start..]));

    for window in windows {
        best = best.max(ratio_chars(needle, window));
        if best >= 100.0 {
            break;
        }
    }

    best
}

/// Substring-tolerant similarity: the shorter string scored against the best
/// aligned part of the longer one.
///
/// One empty operand scores 0, two empty operands score 100.
///
/// ```
/// use fuzzy_cleanse::data::similarity::partial_ratio;
///
/// assert_eq!(partial_ratio("smith", "john smith jr"), 100.0);
/// assert_eq!(partial_ratio("jon", "john"), 80.0);
/// assert!(partial_ratio("jon", "completely different") < 80.0);
/// ```
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };

    if short.is_empty() {
        return if long.is_empty() { 100.0 } else { 0.0 };
    }

    let score = best_window(short, long);
    if short.len() == long.len() && score < 100.0 {
        return score.max(best_window(long, short));
    }
    score
}
