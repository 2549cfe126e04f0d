//! Ranks discovered form elements against a field's label hints.
//!
//! Matching is fuzzy but the ranking is fully deterministic: ties break on
//! normalized label, then locator, so an unchanged form always yields the
//! same candidate order.

mod similarity;

pub use similarity::{normalized_similarity, similarity};

use canonfill_core_types::FormCandidate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Minimum label similarity for a candidate to be fill-eligible.
pub const MIN_SCORE: f64 = 0.6;

static SUBMIT_LIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(submit|sign|confirm)").unwrap());

/// Labels that suggest an action control; matching one is never allowed.
pub fn is_submit_like(text: &str) -> bool {
    SUBMIT_LIKE.is_match(text)
}

/// A candidate with its best-hint score attached.
#[derive(Clone, Debug)]
pub struct RankedCandidate {
    pub score: f64,
    pub candidate: FormCandidate,
}

impl RankedCandidate {
    pub fn eligible(&self) -> bool {
        self.score >= MIN_SCORE
    }
}

/// Score every candidate against the hint list and sort best-first.
///
/// An element's score is the max over hints. Sort key is
/// `(score desc, label asc, locator asc)`.
pub fn rank_candidates(candidates: &[FormCandidate], labels: &[String]) -> Vec<RankedCandidate> {
    let mut scored: Vec<RankedCandidate> = candidates
        .iter()
        .map(|candidate| {
            let best = labels
                .iter()
                .map(|label| normalized_similarity(label, &candidate.label_text))
                .fold(0.0f64, f64::max);
            RankedCandidate {
                score: best,
                candidate: candidate.clone(),
            }
        })
        .collect();
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                a.candidate
                    .label_text
                    .to_lowercase()
                    .cmp(&b.candidate.label_text.to_lowercase())
            })
            .then_with(|| a.candidate.locator.cmp(&b.candidate.locator))
    });
    scored
}
