//! The end-to-end coverage report: one audit row per declared field,
//! joining the canonical value, the autofill outcome, and both validation
//! verdicts. This is the artifact a reviewer or test harness uses to
//! certify a submission safe to send.

use canonfill_core_types::{
    DeterministicVerdict, FailureReason, FillResult, HumanReasonCategory, RunId, Status,
};
use canonfill_core_types::AutofillReport;
use canonfill_field_registry::{CanonicalRecord, FieldRegistry};
use chrono::Utc;
use field_resolver::{FieldReportEntry, ReviewSummary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One field's audit row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoverageRow {
    pub field: String,
    pub extracted_value: Option<String>,
    pub resolved_override_value: Option<String>,
    pub autofill_attempted: bool,
    pub autofill_selector_used: Option<String>,
    pub dom_readback_value: Option<String>,
    pub autofill_result: FillResult,
    pub autofill_failure_reason_code: Option<FailureReason>,
    pub deterministic_validation_verdict: DeterministicVerdict,
    pub deterministic_reason_codes: Vec<String>,
    pub llm_validation_invoked: bool,
    pub llm_verdict: Option<Status>,
    pub llm_score: Option<f64>,
    pub llm_reason: Option<String>,
    pub requires_human_input: bool,
    pub human_reason_category: HumanReasonCategory,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoverageReport {
    pub run_id: RunId,
    pub generated_at: String,
    pub ready_for_autofill: bool,
    pub fields: Vec<CoverageRow>,
}

/// Join canonical, autofill, and validation state per declared field.
pub fn build_coverage_report(
    run_id: RunId,
    registry: &FieldRegistry,
    record: &CanonicalRecord,
    autofill: &AutofillReport,
    validation: &BTreeMap<String, FieldReportEntry>,
    summary: &ReviewSummary,
) -> CoverageReport {
    let mut fields = Vec::with_capacity(registry.len());
    for spec in registry.iter() {
        let path = spec.key.as_str();
        let extracted_value = record.value(path);
        let resolved_override_value = record.resolved_override(path);
        let entry = autofill.entry(path);

        let mut attempted = entry.map(|e| e.attempted).unwrap_or_else(|| {
            autofill.attempted_fields.iter().any(|f| f == path)
                || autofill.filled_fields.iter().any(|f| f == path)
        });
        let mut selector_used = entry.and_then(|e| e.selector_used.clone());
        let dom_value = entry
            .and_then(|e| e.dom_readback_value.clone())
            .or_else(|| autofill.dom_readback.get(path).cloned().flatten());
        let mut failure_reason = entry
            .and_then(|e| e.failure_reason)
            .or_else(|| autofill.fill_failures.get(path).copied());
        let value_present = resolved_override_value
            .as_deref()
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false)
            || extracted_value
                .as_deref()
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false);

        let autofill_result = if spec.autofill.is_none() {
            attempted = false;
            selector_used = None;
            failure_reason = Some(FailureReason::NoAutofillSpec);
            FillResult::Skip
        } else if !value_present && !attempted {
            if failure_reason.is_none() {
                failure_reason = Some(FailureReason::NoValue);
            }
            FillResult::Skip
        } else {
            entry.and_then(|e| e.result).unwrap_or({
                if failure_reason.is_some() {
                    FillResult::Fail
                } else if attempted {
                    FillResult::Pass
                } else {
                    FillResult::Skip
                }
            })
        };

        let validation_entry = validation.get(path);
        let deterministic = validation_entry.map(|e| e.deterministic_validation());
        let deterministic_validation_verdict = deterministic
            .as_ref()
            .map(|d| d.verdict)
            .unwrap_or(DeterministicVerdict::NeedsReview);
        let deterministic_reason_codes = deterministic
            .map(|d| d.reason_codes)
            .unwrap_or_default();
        let llm = validation_entry.and_then(|e| e.llm_validation.as_ref());
        let llm_validation_invoked = validation_entry
            .map(|e| e.llm_validation_invoked || e.llm_validation.is_some())
            .unwrap_or(false);

        fields.push(CoverageRow {
            field: path.to_string(),
            extracted_value,
            resolved_override_value,
            autofill_attempted: attempted,
            autofill_selector_used: selector_used,
            dom_readback_value: dom_value,
            autofill_result,
            autofill_failure_reason_code: failure_reason,
            deterministic_validation_verdict,
            deterministic_reason_codes,
            llm_validation_invoked,
            llm_verdict: llm.map(|l| l.verdict),
            llm_score: llm.and_then(|l| l.score),
            llm_reason: llm.map(|l| l.reason.clone()).filter(|r| !r.is_empty()),
            requires_human_input: validation_entry
                .map(|e| e.requires_human_input)
                .unwrap_or(false),
            human_reason_category: validation_entry
                .map(|e| e.human_reason_category)
                .unwrap_or_default(),
        });
    }

    CoverageReport {
        run_id,
        generated_at: Utc::now().to_rfc3339(),
        ready_for_autofill: summary.ready_for_autofill,
        fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonfill_core_types::{FieldCandidate, Presence, Source};
    use field_resolver::{
        apply_candidate, resolve_fields, summarize_review, MatchQuality, ResolveOptions,
    };

    #[tokio::test]
    async fn rows_cover_every_declared_field() {
        let registry = FieldRegistry::builtin().unwrap();
        let mut record = CanonicalRecord::default();
        apply_candidate(
            &mut record,
            &FieldCandidate {
                path: "passport.surname".into(),
                value: "Eriksson".into(),
                source: Source::Mrz,
                evidence: None,
                confidence: None,
                presence: Presence::Present,
            },
            MatchQuality::Exact,
        );
        let autofill = AutofillReport::default();
        let resolve = resolve_fields(
            &registry,
            &record,
            &autofill,
            None,
            &ResolveOptions::default(),
        )
        .await;
        let summary = summarize_review(&registry, &resolve.fields);
        let report = build_coverage_report(
            RunId::new(),
            &registry,
            &resolve.record,
            &autofill,
            &resolve.fields,
            &summary,
        );
        assert_eq!(report.fields.len(), registry.len());
        assert!(report.ready_for_autofill);

        let surname = report
            .fields
            .iter()
            .find(|r| r.field == "passport.surname")
            .unwrap();
        assert_eq!(surname.extracted_value.as_deref(), Some("Eriksson"));
        assert_eq!(
            surname.deterministic_validation_verdict,
            DeterministicVerdict::Verified
        );
        assert_eq!(surname.autofill_result, FillResult::Skip);

        // Fields without an autofill mapping carry the explicit marker.
        let full_name = report
            .fields
            .iter()
            .find(|r| r.field == "passport.full_name")
            .unwrap();
        assert_eq!(
            full_name.autofill_failure_reason_code,
            Some(FailureReason::NoAutofillSpec)
        );
    }

    #[tokio::test]
    async fn override_value_surfaces_only_for_user_sources() {
        let registry = FieldRegistry::builtin().unwrap();
        let mut record = CanonicalRecord::default();
        record.meta.resolved_fields.insert(
            "passport.surname".into(),
            canonfill_core_types::ResolvedField {
                key: "passport.surname".into(),
                value: Some("Corrected".into()),
                status: Status::Green,
                confidence: 1.0,
                source: Source::User,
                locked: true,
                requires_human_input: false,
                reason: None,
                suggestions: Vec::new(),
                last_validated_at: None,
                version: 1,
            },
        );
        let autofill = AutofillReport::default();
        let resolve = resolve_fields(
            &registry,
            &record,
            &autofill,
            None,
            &ResolveOptions::default(),
        )
        .await;
        let summary = summarize_review(&registry, &resolve.fields);
        let report = build_coverage_report(
            RunId::new(),
            &registry,
            &resolve.record,
            &autofill,
            &resolve.fields,
            &summary,
        );
        let surname = report
            .fields
            .iter()
            .find(|r| r.field == "passport.surname")
            .unwrap();
        assert_eq!(surname.resolved_override_value.as_deref(), Some("Corrected"));
    }
}
