//! Case/punctuation-insensitive string similarity.
//!
//! Ratio of total matching-block length to combined length, the classic
//! Ratcliff/Obershelp measure: recursively find the longest common
//! substring, then match the pieces on either side.

use once_cell::sync::Lazy;
use regex::Regex;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

pub fn normalize_label(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = NON_ALNUM.replace_all(&lowered, " ");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

fn longest_match(a: &[char], b: &[char]) -> (usize, usize, usize) {
    // One-row DP over suffix lengths; O(len_a * len_b) on short labels.
    let mut best = (0usize, 0usize, 0usize);
    let mut row = vec![0usize; b.len() + 1];
    for i in 1..=a.len() {
        let mut prev_diag = 0usize;
        for j in 1..=b.len() {
            let saved = row[j];
            if a[i - 1] == b[j - 1] {
                row[j] = prev_diag + 1;
                if row[j] > best.2 {
                    best = (i - row[j], j - row[j], row[j]);
                }
            } else {
                row[j] = 0;
            }
            prev_diag = saved;
        }
    }
    best
}

fn matching_total(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (ai, bi, size) = longest_match(a, b);
    if size == 0 {
        return 0;
    }
    size + matching_total(&a[..ai], &b[..bi]) + matching_total(&a[ai + size..], &b[bi + size..])
}

/// Raw similarity of two strings in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let total = a_chars.len() + b_chars.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_total(&a_chars, &b_chars) as f64 / total as f64
}

/// Similarity after case folding and punctuation stripping.
pub fn normalized_similarity(a: &str, b: &str) -> f64 {
    similarity(&normalize_label(a), &normalize_label(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(similarity("state", "state"), 1.0);
        assert_eq!(normalized_similarity("State!", "state"), 1.0);
    }

    #[test]
    fn disjoint_strings_score_zero() {
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn punctuation_and_case_ignored() {
        let a = normalized_similarity("1.a. Last Name", "last name");
        assert!(a > 0.7, "got {a}");
    }

    #[test]
    fn near_matches_score_high() {
        let score = normalized_similarity("Date of Birth", "Date of Birth (mm/dd/yyyy)");
        assert!(score > 0.6, "got {score}");
    }

    #[test]
    fn empty_inputs() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("a", ""), 0.0);
    }
}
