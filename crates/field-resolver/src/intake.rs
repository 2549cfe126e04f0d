//! Applying extraction candidates onto the canonical record.

use canonfill_core_types::{FieldCandidate, Source, Status, SuggestionOption};
use canonfill_field_registry::CanonicalRecord;

use crate::confidence::{estimate_confidence, MatchQuality};

/// Write one extracted candidate into the record, tracking provenance,
/// confidence, and evidence. A `None`-valued candidate never overwrites.
pub fn apply_candidate(
    record: &mut CanonicalRecord,
    candidate: &FieldCandidate,
    match_quality: MatchQuality,
) {
    if candidate.value.trim().is_empty() {
        return;
    }
    record.set_value(&candidate.path, Some(candidate.value.clone()));
    record
        .meta
        .sources
        .insert(candidate.path.clone(), candidate.source);
    let confidence = candidate.confidence.unwrap_or_else(|| {
        estimate_confidence(
            candidate.source,
            Some(&candidate.value),
            candidate.evidence.as_deref(),
            match_quality,
        )
    });
    record
        .meta
        .confidence
        .insert(candidate.path.clone(), confidence);
    record
        .meta
        .status
        .entry(candidate.path.clone())
        .or_insert(Status::Unknown);
    record
        .meta
        .presence
        .insert(candidate.path.clone(), candidate.presence);
    if let Some(evidence) = &candidate.evidence {
        if !evidence.is_empty() {
            record
                .meta
                .evidence
                .insert(candidate.path.clone(), evidence.clone());
        }
    }
}

/// Attach an alternative value to a field; deduplicated on (value, source).
pub fn add_suggestion(
    record: &mut CanonicalRecord,
    path: &str,
    value: &str,
    reason: Option<&str>,
    source: Source,
    confidence: Option<f64>,
    evidence: Option<&str>,
    requires_confirmation: bool,
) {
    let entries = record
        .meta
        .suggestions
        .entry(path.to_string())
        .or_default();
    if entries
        .iter()
        .any(|s| s.value == value && s.source == source)
    {
        return;
    }
    entries.push(SuggestionOption {
        value: value.to_string(),
        reason: reason.map(|r| r.to_string()),
        source,
        confidence,
        evidence: evidence.map(|e| e.to_string()),
        requires_confirmation,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonfill_core_types::Presence;

    #[test]
    fn candidate_lands_with_metadata() {
        let mut record = CanonicalRecord::default();
        apply_candidate(
            &mut record,
            &FieldCandidate {
                path: "passport.passport_number".into(),
                value: "L898902C3".into(),
                source: Source::Mrz,
                evidence: Some("L898902C36UTO...".into()),
                confidence: None,
                presence: Presence::Present,
            },
            MatchQuality::Exact,
        );
        assert_eq!(
            record.value("passport.passport_number").as_deref(),
            Some("L898902C3")
        );
        assert_eq!(
            record.meta.source_of("passport.passport_number"),
            Source::Mrz
        );
        assert!(record.meta.confidence["passport.passport_number"] > 0.9);
        assert!(record.meta.evidence.contains_key("passport.passport_number"));
    }

    #[test]
    fn suggestions_deduplicate() {
        let mut record = CanonicalRecord::default();
        for _ in 0..2 {
            add_suggestion(
                &mut record,
                "passport.surname",
                "Eriksson",
                Some("normalized"),
                Source::Validator,
                Some(0.7),
                None,
                false,
            );
        }
        assert_eq!(record.meta.suggestions["passport.surname"].len(), 1);
    }
}
