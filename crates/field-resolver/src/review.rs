//! Run-level review summary and the autofill readiness gate.

use std::collections::BTreeMap;

use canonfill_core_types::{HumanReasonCategory, IssueType};
use canonfill_field_registry::FieldRegistry;
use serde::{Deserialize, Serialize};

use crate::engine::FieldReportEntry;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub needs_review: usize,
    pub auto_approved: usize,
    pub optional_missing: usize,
    pub required_missing: usize,
    pub conflicts: usize,
    pub total: usize,
    pub review_fields: Vec<String>,
    pub auto_fields: Vec<String>,
    /// True iff zero fields carry an unresolved conflict.
    pub ready_for_autofill: bool,
}

fn is_conflict(entry: &FieldReportEntry) -> bool {
    entry.issue_type == IssueType::Conflict
        || entry
            .deterministic_codes
            .iter()
            .any(|c| c == "conflict_sources" || c == "country_conflict")
        || entry.human_reason_category == HumanReasonCategory::ConflictSources
}

fn value_missing(entry: &FieldReportEntry) -> bool {
    entry
        .dom_readback_value
        .as_deref()
        .or(entry.extracted_value.as_deref())
        .map(|v| v.trim().is_empty())
        .unwrap_or(true)
}

/// Fold the per-field rows into reviewer-facing counts.
pub fn summarize_review(
    registry: &FieldRegistry,
    fields: &BTreeMap<String, FieldReportEntry>,
) -> ReviewSummary {
    let mut summary = ReviewSummary::default();
    for spec in registry.iter() {
        let Some(entry) = fields.get(&spec.key) else {
            continue;
        };
        if is_conflict(entry) {
            summary.needs_review += 1;
            summary.conflicts += 1;
            summary.review_fields.push(spec.key.clone());
        } else {
            summary.auto_approved += 1;
            summary.auto_fields.push(spec.key.clone());
        }
        let missing = value_missing(entry);
        if spec.required && missing {
            summary.required_missing += 1;
        }
        if !spec.required && missing {
            summary.optional_missing += 1;
        }
        summary.total += 1;
    }
    summary.ready_for_autofill = summary.conflicts == 0;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonfill_core_types::{
        DeterministicVerdict, FillResult, Status,
    };

    fn entry(field: &str, issue: IssueType) -> FieldReportEntry {
        FieldReportEntry {
            field: field.to_string(),
            status: Status::Green,
            deterministic_status: Status::Green,
            deterministic_verdict: DeterministicVerdict::Verified,
            issue_type: issue,
            deterministic_reason: String::new(),
            deterministic_codes: Vec::new(),
            llm_validation: None,
            llm_validation_invoked: false,
            extracted_value: Some("value".into()),
            resolved_override_value: None,
            dom_readback_value: None,
            attempted_autofill: false,
            autofill_result: FillResult::Skip,
            autofill_failure: None,
            autofill_selector_used: None,
            locked: false,
            requires_human_input: false,
            human_reason: String::new(),
            human_reason_category: HumanReasonCategory::OptionalEmpty,
            human_action: String::new(),
        }
    }

    #[test]
    fn gate_closes_on_any_conflict() {
        let registry = FieldRegistry::builtin().unwrap();
        let mut fields = BTreeMap::new();
        for spec in registry.iter() {
            fields.insert(spec.key.clone(), entry(&spec.key, IssueType::Ok));
        }
        let open = summarize_review(&registry, &fields);
        assert!(open.ready_for_autofill);
        assert_eq!(open.conflicts, 0);

        fields
            .get_mut("representation.client.family_name")
            .unwrap()
            .issue_type = IssueType::Conflict;
        let closed = summarize_review(&registry, &fields);
        assert!(!closed.ready_for_autofill);
        assert_eq!(closed.conflicts, 1);
        assert!(closed
            .review_fields
            .contains(&"representation.client.family_name".to_string()));
    }
}
