//! Deterministic confidence estimation by source authority tier.

use canonfill_core_types::Source;

/// Whether an OCR capture matched its label exactly or fuzzily.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MatchQuality {
    #[default]
    Exact,
    Fuzzy,
}

/// Base score for a source tier. USER is authoritative; MRZ is machine
/// readable and check-digit protected; OCR varies with match quality.
pub fn base_confidence_for_source(source: Source, match_quality: MatchQuality) -> f64 {
    match source {
        Source::Mrz => 0.95,
        Source::User => 1.0,
        Source::Llm | Source::Ai => 0.7,
        Source::Validator | Source::Merge | Source::Passport => 0.85,
        Source::Ocr => match match_quality {
            MatchQuality::Exact => 0.75,
            MatchQuality::Fuzzy => 0.6,
        },
        Source::Unknown => 0.7,
    }
}

/// Bounded [0, 0.15] richness bonus: longer values, alphanumeric balance,
/// and surrounding evidence each add a little. Monotonic in each input so a
/// denser value never scores below a sparser one within a tier.
fn value_quality_score(value: &str, evidence: Option<&str>) -> f64 {
    let text = value.trim();
    if text.is_empty() {
        return 0.0;
    }
    let length_bonus = (text.len() as f64 / 32.0).min(1.0) * 0.1;
    let mut balance_bonus = 0.0;
    if text.chars().any(|c| c.is_alphabetic()) {
        balance_bonus += 0.015;
    }
    if text.chars().any(|c| c.is_ascii_digit()) {
        balance_bonus += 0.015;
    }
    let evidence_bonus = if evidence.is_some_and(|e| !e.is_empty()) {
        0.02
    } else {
        0.0
    };
    length_bonus + balance_bonus + evidence_bonus
}

/// Estimate a confidence score in [0, 0.99], with USER pinned to 1.0.
pub fn estimate_confidence(
    source: Source,
    value: Option<&str>,
    evidence: Option<&str>,
    match_quality: MatchQuality,
) -> f64 {
    if source == Source::User {
        return 1.0;
    }
    let base = base_confidence_for_source(source, match_quality);
    let score = base + value.map(|v| value_quality_score(v, evidence)).unwrap_or(0.0);
    (score.clamp(0.0, 0.99) * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ordering() {
        let mrz = estimate_confidence(Source::Mrz, Some("L898902C3"), None, MatchQuality::Exact);
        let merge =
            estimate_confidence(Source::Merge, Some("L898902C3"), None, MatchQuality::Exact);
        let llm = estimate_confidence(Source::Llm, Some("L898902C3"), None, MatchQuality::Exact);
        let ocr_fuzzy =
            estimate_confidence(Source::Ocr, Some("L898902C3"), None, MatchQuality::Fuzzy);
        assert!(mrz > merge && merge > llm && llm > ocr_fuzzy);
    }

    #[test]
    fn user_pinned_to_one() {
        assert_eq!(
            estimate_confidence(Source::User, Some("x"), None, MatchQuality::Exact),
            1.0
        );
    }

    #[test]
    fn bounded_below_point_99() {
        let score = estimate_confidence(
            Source::Mrz,
            Some("a very long evidence-rich value 123456789"),
            Some("surrounding evidence"),
            MatchQuality::Exact,
        );
        assert!(score <= 0.99);
    }

    #[test]
    fn monotonic_within_tier() {
        let sparse = estimate_confidence(Source::Ocr, Some("ab"), None, MatchQuality::Exact);
        let dense = estimate_confidence(
            Source::Ocr,
            Some("221 Baker Street 4B"),
            Some("line context"),
            MatchQuality::Exact,
        );
        assert!(dense >= sparse);
    }
}
