//! The per-field status engine.
//!
//! One pass runs per field in a fixed order: lock passthrough, human-required
//! gate, autofill failure, missing value, deterministic rules, conflict
//! floor, then the optional bounded LLM merge. Each pass emits a new
//! versioned [`ResolvedField`]; locked human/AI entries are copied forward
//! with only metadata refreshed.

use std::collections::{BTreeMap, BTreeSet};

use canonfill_core_types::{
    AutofillReport, DeterministicVerdict, FailureReason, FillResult, HumanReasonCategory,
    IssueType, Presence, ResolvedField, Source, Status, SuggestionOption, ValidationOutcome,
};
use canonfill_field_registry::{CanonicalRecord, FieldRegistry, FieldSpec};
use chrono::Utc;
use rule_validator::mrz::checks_from_evidence;
use rule_validator::rules::{validate_field, RuleContext};
use rule_validator::noise::is_placeholder_value;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::merge::cross_field_country_check;
use crate::policy::{should_invoke_llm, LlmScope, ScopeInput};
use crate::verdict::{
    clip_text, final_status, run_batched, suggestion_grounded, BatchPolicy, ContextLimits,
    FieldContext, VerdictPort,
};

/// LLM verdict attached to one field's report entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmValidation {
    pub verdict: Status,
    pub score: Option<f64>,
    pub reason: String,
    pub evidence: Option<String>,
    pub suggested_value: Option<String>,
    pub requires_human_input: bool,
}

/// One field's full reconciliation row for this pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldReportEntry {
    pub field: String,
    pub status: Status,
    pub deterministic_status: Status,
    pub deterministic_verdict: DeterministicVerdict,
    pub issue_type: IssueType,
    pub deterministic_reason: String,
    pub deterministic_codes: Vec<String>,
    pub llm_validation: Option<LlmValidation>,
    pub llm_validation_invoked: bool,
    pub extracted_value: Option<String>,
    pub resolved_override_value: Option<String>,
    pub dom_readback_value: Option<String>,
    pub attempted_autofill: bool,
    pub autofill_result: FillResult,
    pub autofill_failure: Option<FailureReason>,
    pub autofill_selector_used: Option<String>,
    pub locked: bool,
    pub requires_human_input: bool,
    pub human_reason: String,
    pub human_reason_category: HumanReasonCategory,
    pub human_action: String,
}

impl FieldReportEntry {
    /// The deterministic pass as a standalone outcome record.
    pub fn deterministic_validation(&self) -> ValidationOutcome {
        ValidationOutcome {
            status: self.deterministic_status,
            issue_type: self.issue_type,
            verdict: self.deterministic_verdict,
            reason_codes: self.deterministic_codes.clone(),
            reason: self.deterministic_reason.clone(),
            human_required: self.human_reason_category == HumanReasonCategory::HumanConsent,
            human_reason_category: self.human_reason_category,
            requires_human_input: self.requires_human_input,
        }
    }
}

/// Options for one resolver pass.
#[derive(Clone, Debug, Default)]
pub struct ResolveOptions {
    pub use_llm: bool,
    pub scope: LlmScope,
    pub limits: ContextLimits,
    pub batch: BatchPolicy,
}

/// Result of one resolver pass: the per-field rows plus the updated record.
#[derive(Clone, Debug)]
pub struct ResolveReport {
    pub llm_used: bool,
    pub llm_error: Option<String>,
    pub fields: BTreeMap<String, FieldReportEntry>,
    pub record: CanonicalRecord,
}

fn is_empty(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}

fn deterministic_reason(issue_type: IssueType, detail: Option<&str>) -> String {
    let base = match issue_type {
        IssueType::Ok => "Looks valid.",
        IssueType::EmptyRequired => "Expected in document but extraction likely failed.",
        IssueType::EmptyOptional => "Optional field left empty.",
        IssueType::EmptyOptionalPresent => "Label present but optional field missing.",
        IssueType::InvalidFormat => "Value format looks invalid.",
        IssueType::SuspectLabelCapture => "Looks like a label or header, not a value.",
        IssueType::Conflict => "Conflicts with another credible source.",
        IssueType::AutofillFailed => "Autofill failed to set this field.",
        IssueType::NotPresentInDoc => "Not found in document; needs human input.",
        IssueType::HumanRequired => "Human consent required; do not autofill.",
    };
    match detail {
        Some(detail) => format!("{base} {detail}"),
        None => base.to_string(),
    }
}

struct HumanPayload {
    requires_human_input: bool,
    human_reason: String,
    human_reason_category: HumanReasonCategory,
    human_action: String,
}

impl Default for HumanPayload {
    fn default() -> Self {
        Self {
            requires_human_input: false,
            human_reason: String::new(),
            human_reason_category: HumanReasonCategory::OptionalEmpty,
            human_action: String::new(),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn human_reason_payload(
    spec: &FieldSpec,
    presence: Presence,
    conflict: bool,
    issue_type: IssueType,
    failure_reason: Option<FailureReason>,
    deterministic_codes: &[String],
    value_missing: bool,
) -> HumanPayload {
    if conflict {
        return HumanPayload {
            requires_human_input: true,
            human_reason: "Conflict between credible sources; user confirmation required.".into(),
            human_reason_category: HumanReasonCategory::ConflictSources,
            human_action: "Confirm which source is correct.".into(),
        };
    }
    if let Some(reason) = failure_reason {
        if spec.required {
            return HumanPayload {
                requires_human_input: true,
                human_reason: format!("Autofill failed: {reason}."),
                human_reason_category: HumanReasonCategory::AutofillFailed,
                human_action: "Enter manually or update the form selector mapping.".into(),
            };
        }
        return HumanPayload {
            requires_human_input: false,
            human_reason: "Optional field autofill failed.".into(),
            human_reason_category: HumanReasonCategory::OptionalEmpty,
            human_action: "Enter manually if needed.".into(),
        };
    }
    if value_missing {
        if spec.required {
            let reason = match presence {
                Presence::Present => "Label found but value missing in extraction.",
                Presence::Absent => "Value not found in the document.",
                Presence::Unknown => "Value missing from extraction.",
            };
            return HumanPayload {
                requires_human_input: true,
                human_reason: reason.into(),
                human_reason_category: HumanReasonCategory::MissingNotFound,
                human_action: "Enter manually or re-upload a clearer document.".into(),
            };
        }
        return HumanPayload {
            requires_human_input: false,
            human_reason: "Optional field left blank.".into(),
            human_reason_category: HumanReasonCategory::OptionalEmpty,
            human_action: "No action required.".into(),
        };
    }
    match issue_type {
        IssueType::SuspectLabelCapture => HumanPayload {
            requires_human_input: true,
            human_reason: "Captured value looks like a label, not a real value.".into(),
            human_reason_category: HumanReasonCategory::MissingNotFound,
            human_action: "Enter the correct value manually.".into(),
        },
        IssueType::InvalidFormat => {
            if deterministic_codes.iter().any(|c| c == "date_format") {
                HumanPayload {
                    requires_human_input: true,
                    human_reason: "Ambiguous date format; cannot normalize safely.".into(),
                    human_reason_category: HumanReasonCategory::AmbiguousEvidence,
                    human_action: "Confirm the correct date format.".into(),
                }
            } else {
                HumanPayload {
                    requires_human_input: true,
                    human_reason: "Value format looks invalid.".into(),
                    human_reason_category: HumanReasonCategory::InvalidFormat,
                    human_action: "Correct the value manually.".into(),
                }
            }
        }
        _ => HumanPayload::default(),
    }
}

fn allow_placeholder(spec: &FieldSpec) -> bool {
    if spec.required {
        return false;
    }
    spec.key.ends_with("address.unit") || spec.key.contains("phone")
}

/// Autofill observations for one path, whichever shape the report carried.
struct AutofillView {
    attempted: bool,
    selector_used: Option<String>,
    dom_value: Option<String>,
    result: FillResult,
    failure_reason: Option<FailureReason>,
}

fn autofill_view(report: &AutofillReport, path: &str) -> AutofillView {
    if let Some(entry) = report.entry(path) {
        let failure = entry
            .failure_reason
            .or_else(|| report.fill_failures.get(path).copied());
        let result = entry.result.unwrap_or(if failure.is_some() {
            FillResult::Fail
        } else if entry.attempted {
            FillResult::Pass
        } else {
            FillResult::Skip
        });
        return AutofillView {
            attempted: entry.attempted,
            selector_used: entry.selector_used.clone(),
            dom_value: entry.dom_readback_value.clone(),
            result,
            failure_reason: failure,
        };
    }
    let dom_value = report.dom_readback.get(path).cloned().flatten();
    let failure = report.fill_failures.get(path).copied();
    let attempted = report.attempted_fields.iter().any(|f| f == path)
        || report.filled_fields.iter().any(|f| f == path);
    let result = if failure.is_some() {
        FillResult::Fail
    } else if attempted {
        FillResult::Pass
    } else {
        FillResult::Skip
    };
    AutofillView {
        attempted,
        selector_used: None,
        dom_value,
        result,
        failure_reason: failure,
    }
}

const MRZ_CHECKED_PATHS: &[(&str, usize)] = &[
    ("passport.passport_number", 0),
    ("passport.date_of_birth", 1),
    ("passport.date_of_expiration", 2),
];

fn mrz_check_failed(record: &CanonicalRecord, path: &str) -> bool {
    let Some((_, slot)) = MRZ_CHECKED_PATHS.iter().find(|(p, _)| *p == path) else {
        return false;
    };
    if record.meta.source_of(path) != Source::Mrz {
        return false;
    }
    let Some(evidence) = record.meta.evidence.get(path) else {
        return false;
    };
    let Some(checks) = checks_from_evidence(evidence) else {
        return false;
    };
    let ok = match slot {
        0 => checks.passport_number,
        1 => checks.date_of_birth,
        _ => checks.date_of_expiration,
    };
    !ok
}

fn locked_entry(spec: &FieldSpec, existing: &ResolvedField, view: &AutofillView) -> FieldReportEntry {
    let status = existing.status;
    let human_reason = existing
        .reason
        .clone()
        .unwrap_or_else(|| "Locked by user.".to_string());
    let requires_human = existing.requires_human_input;
    FieldReportEntry {
        field: spec.key.clone(),
        status,
        deterministic_status: status,
        deterministic_verdict: DeterministicVerdict::from_status(status),
        issue_type: IssueType::Ok,
        deterministic_reason: human_reason.clone(),
        deterministic_codes: Vec::new(),
        llm_validation: None,
        llm_validation_invoked: false,
        extracted_value: existing.value.clone(),
        resolved_override_value: existing.value.clone(),
        dom_readback_value: view.dom_value.clone(),
        attempted_autofill: view.attempted,
        autofill_result: view.result,
        autofill_failure: view.failure_reason,
        autofill_selector_used: view.selector_used.clone(),
        locked: true,
        requires_human_input: requires_human,
        human_reason,
        human_reason_category: if requires_human {
            HumanReasonCategory::MissingNotFound
        } else {
            HumanReasonCategory::OptionalEmpty
        },
        human_action: if requires_human {
            "Confirm or enter manually.".into()
        } else {
            "No action required.".into()
        },
    }
}

/// Deterministic evaluation for one unlocked field.
fn deterministic_entry(
    spec: &FieldSpec,
    record: &CanonicalRecord,
    view: &AutofillView,
    conflict: bool,
) -> FieldReportEntry {
    let path = spec.key.as_str();
    let presence = record.meta.presence_of(path);
    let extracted_value = record.value(path);
    let resolved_override_value = record.resolved_override(path);
    let value = view
        .dom_value
        .clone()
        .or_else(|| extracted_value.clone())
        .map(|v| v.trim().to_string())
        .unwrap_or_default();
    let value_missing = value.is_empty();

    let mut status = Status::Green;
    let mut issue_type = IssueType::Ok;
    let mut codes: Vec<String> = Vec::new();
    let mut reason = String::new();

    let failure_for_rules = if view.result == FillResult::Fail {
        view.failure_reason
    } else {
        None
    };

    let human_required_reason = spec
        .human_required_reason
        .clone()
        .unwrap_or_else(|| deterministic_reason(IssueType::HumanRequired, None));
    let human_gate = spec.human_required && value_missing;

    if human_gate {
        status = Status::Amber;
        issue_type = IssueType::HumanRequired;
        codes.push("human_required".into());
        reason = human_required_reason.clone();
    } else if let Some(failure) = failure_for_rules {
        status = if spec.required { Status::Red } else { Status::Amber };
        issue_type = IssueType::AutofillFailed;
        codes.push(format!("autofill_{failure}"));
        reason = deterministic_reason(issue_type, Some(failure.as_str()));
    } else if value_missing {
        codes.push("empty".into());
        if spec.required {
            status = Status::Red;
            issue_type = if presence == Presence::Absent {
                IssueType::NotPresentInDoc
            } else {
                IssueType::EmptyRequired
            };
        } else if presence == Presence::Present {
            status = Status::Amber;
            issue_type = IssueType::EmptyOptionalPresent;
        } else {
            status = Status::Green;
            issue_type = IssueType::EmptyOptional;
        }
        reason = deterministic_reason(issue_type, None);
    } else {
        let placeholder_ok = allow_placeholder(spec);
        if placeholder_ok && is_placeholder_value(&value) {
            status = Status::Amber;
            issue_type = IssueType::EmptyOptional;
            codes.push("placeholder_ok".into());
            reason = deterministic_reason(issue_type, None);
        } else if mrz_check_failed(record, path) {
            status = Status::Red;
            issue_type = IssueType::InvalidFormat;
            codes.push("mrz_check_digit".into());
            reason = deterministic_reason(issue_type, Some("MRZ check digit failed."));
        } else {
            let country_path = path.replace("zip", "country");
            let context = RuleContext {
                country: record.value(&country_path),
                allow_placeholder: placeholder_ok,
            };
            let outcome =
                validate_field(path, spec.field_type, &value, &spec.label_hints, &context);
            if !outcome.is_valid {
                status = Status::Red;
                issue_type = if outcome.has_label_noise() {
                    IssueType::SuspectLabelCapture
                } else {
                    IssueType::InvalidFormat
                };
            } else if outcome.has_benign_amber() {
                status = Status::Amber;
            } else {
                status = Status::Green;
            }
            codes.extend(outcome.reasons.iter().map(|r| r.to_string()));
            reason = deterministic_reason(issue_type, None);
        }
    }

    // The conflict floor overrides a clean rule pass, never a red.
    if !human_gate && conflict {
        codes.push("conflict_sources".into());
        if status == Status::Green {
            status = Status::Amber;
            issue_type = IssueType::Conflict;
            reason = deterministic_reason(issue_type, None);
        }
    }

    if reason.is_empty() {
        reason = deterministic_reason(issue_type, None);
    }

    let human = if human_gate {
        HumanPayload {
            requires_human_input: true,
            human_reason: human_required_reason,
            human_reason_category: HumanReasonCategory::HumanConsent,
            human_action: "Complete manually in the form.".into(),
        }
    } else {
        human_reason_payload(
            spec,
            presence,
            conflict,
            issue_type,
            failure_for_rules,
            &codes,
            value_missing,
        )
    };

    FieldReportEntry {
        field: spec.key.clone(),
        status,
        deterministic_status: status,
        deterministic_verdict: DeterministicVerdict::from_status(status),
        issue_type,
        deterministic_reason: reason,
        deterministic_codes: codes,
        llm_validation: None,
        llm_validation_invoked: false,
        extracted_value,
        resolved_override_value,
        dom_readback_value: view.dom_value.clone(),
        attempted_autofill: view.attempted,
        autofill_result: view.result,
        autofill_failure: view.failure_reason,
        autofill_selector_used: view.selector_used.clone(),
        locked: false,
        requires_human_input: human.requires_human_input,
        human_reason: human.human_reason,
        human_reason_category: human.human_reason_category,
        human_action: human.human_action,
    }
}

fn build_context(
    spec: &FieldSpec,
    entry: &FieldReportEntry,
    presence: Presence,
    evidence: &str,
    limits: &ContextLimits,
) -> FieldContext {
    FieldContext {
        field: spec.key.clone(),
        label: clip_text(&spec.label, limits.label_max_chars),
        expected_type: spec.field_type.name().to_string(),
        extracted_value: clip_text(
            entry.extracted_value.as_deref().unwrap_or(""),
            limits.value_max_chars,
        ),
        dom_readback_value: clip_text(
            entry.dom_readback_value.as_deref().unwrap_or(""),
            limits.value_max_chars,
        ),
        evidence: clip_text(
            if evidence.is_empty() { "not found" } else { evidence },
            limits.evidence_max_chars,
        ),
        presence: match presence {
            Presence::Present => "present",
            Presence::Absent => "absent",
            Presence::Unknown => "unknown",
        }
        .to_string(),
        deterministic_status: entry.deterministic_status.name().to_string(),
        deterministic_reason_codes: entry.deterministic_codes.clone(),
        deterministic_reason: clip_text(&entry.deterministic_reason, limits.reason_max_chars),
        deterministic_issue_type: entry.issue_type.name().to_string(),
        human_required: spec.human_required,
        human_required_reason: clip_text(
            spec.human_required_reason.as_deref().unwrap_or(""),
            limits.reason_max_chars,
        ),
    }
}

/// Whether an LLM-suggested replacement may enter the suggestion list: it
/// must be grounded in its cited evidence, and is only proposed for
/// non-green fields. The one exception is resolving an explicit conflict,
/// where it must match one of the two conflicting values.
fn suggestion_allowed(
    entry: &FieldReportEntry,
    suggested_value: &str,
    evidence: &str,
    conflict: Option<&canonfill_core_types::Conflict>,
) -> bool {
    if suggested_value.is_empty() || evidence.is_empty() || evidence == "not found" {
        return false;
    }
    if !suggestion_grounded(suggested_value, evidence) {
        return false;
    }
    if entry.deterministic_status != Status::Green {
        return true;
    }
    conflict
        .map(|c| suggested_value == c.value_a || suggested_value == c.value_b)
        .unwrap_or(false)
}

/// Run one full resolver pass over every registered field.
///
/// Per-field evaluation is pure and independent; the cross-field
/// consistency check runs after all per-field passes complete, and the LLM
/// merge runs last so a transport failure degrades to deterministic-only
/// status.
#[instrument(skip_all, fields(fields = registry.len(), use_llm = options.use_llm))]
pub async fn resolve_fields(
    registry: &FieldRegistry,
    record: &CanonicalRecord,
    autofill: &AutofillReport,
    port: Option<&dyn VerdictPort>,
    options: &ResolveOptions,
) -> ResolveReport {
    let mut updated = record.clone();
    let now_iso = Utc::now().to_rfc3339();

    let mut conflict_fields: BTreeSet<String> =
        record.meta.conflicts.keys().cloned().collect();
    conflict_fields.extend(
        record
            .meta
            .warnings
            .iter()
            .filter(|w| w.code == "conflict")
            .filter_map(|w| w.field.clone()),
    );

    let mut fields: BTreeMap<String, FieldReportEntry> = BTreeMap::new();
    let mut contexts: Vec<FieldContext> = Vec::new();

    for spec in registry.iter() {
        let path = spec.key.as_str();
        let view = autofill_view(autofill, path);
        let existing = record.meta.resolved_fields.get(path);
        let conflict = conflict_fields.contains(path);

        if let Some(existing) = existing.filter(|e| e.frozen()) {
            fields.insert(path.to_string(), locked_entry(spec, existing, &view));
            continue;
        }

        let entry = deterministic_entry(spec, record, &view, conflict);

        let scope_input = ScopeInput {
            deterministic_status: entry.deterministic_status,
            conflict,
            autofill_failed: entry.autofill_failure.is_some()
                && entry.autofill_result == FillResult::Fail,
            presence: record.meta.presence_of(path),
            value_missing: is_empty(
                entry
                    .dom_readback_value
                    .as_deref()
                    .or(entry.extracted_value.as_deref()),
            ),
            attempted: entry.attempted_autofill,
        };
        let llm_needed =
            options.use_llm && port.is_some() && should_invoke_llm(spec, scope_input, options.scope);
        if llm_needed {
            let evidence = record
                .meta
                .evidence
                .get(path)
                .cloned()
                .unwrap_or_default();
            contexts.push(build_context(
                spec,
                &entry,
                record.meta.presence_of(path),
                &evidence,
                &options.limits,
            ));
        }
        let mut entry = entry;
        entry.llm_validation_invoked = llm_needed;
        fields.insert(path.to_string(), entry);
    }

    // Cross-field checks run only after all per-field passes complete.
    cross_field_country_check(&mut fields, &mut updated);

    let mut llm_used = false;
    let mut llm_error = None;
    if options.use_llm && port.is_none() {
        llm_error = Some("LLM validator not configured".to_string());
        debug!("LLM pass requested but no verdict port configured");
    }
    if options.use_llm && !contexts.is_empty() {
        if let Some(port) = port {
            llm_used = true;
            let (verdicts, error) = run_batched(port, contexts, &options.batch).await;
            llm_error = error;
            for (path, verdict) in verdicts {
                let Some(entry) = fields.get_mut(&path) else {
                    continue;
                };
                if let Some(status) = verdict.verdict {
                    entry.status = final_status(entry.deterministic_status, Some(status));
                    entry.llm_validation = Some(LlmValidation {
                        verdict: status,
                        score: verdict.score,
                        reason: verdict.reason.clone(),
                        evidence: verdict.evidence.clone(),
                        suggested_value: verdict.suggested_value.clone(),
                        requires_human_input: verdict.requires_human_input,
                    });
                }
                let suggested = verdict.suggested_value.as_deref().unwrap_or("");
                let evidence = verdict.evidence.as_deref().unwrap_or("");
                let conflict = updated.meta.conflicts.get(&path).cloned();
                if suggestion_allowed(entry, suggested, evidence, conflict.as_ref()) {
                    let requires_confirmation = verdict.requires_human_input
                        || matches!(entry.status, Status::Amber | Status::Red)
                        || conflict.is_some();
                    let reason = if !verdict.suggested_value_reason.is_empty() {
                        verdict.suggested_value_reason.clone()
                    } else if !verdict.reason.is_empty() {
                        verdict.reason.clone()
                    } else {
                        "LLM suggestion".to_string()
                    };
                    let entries = updated.meta.suggestions.entry(path.clone()).or_default();
                    if !entries
                        .iter()
                        .any(|s| s.value == suggested && s.source == Source::Llm)
                    {
                        entries.push(SuggestionOption {
                            value: suggested.to_string(),
                            reason: Some(reason),
                            source: Source::Llm,
                            confidence: verdict.score,
                            evidence: Some(evidence.to_string()),
                            requires_confirmation,
                        });
                    }
                }
            }
        }
    }

    // Emit new resolved versions; frozen entries get a metadata-only bump.
    let mut resolved: BTreeMap<String, ResolvedField> = BTreeMap::new();
    for (path, entry) in &fields {
        updated.meta.status.insert(path.clone(), entry.status);
        let existing = record.meta.resolved_fields.get(path);
        if let Some(existing) = existing.filter(|e| e.frozen()) {
            let mut copy = existing.clone();
            copy.last_validated_at = Some(now_iso.clone());
            resolved.insert(path.clone(), copy);
            continue;
        }
        let value = entry
            .dom_readback_value
            .clone()
            .or_else(|| entry.extracted_value.clone())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let source = updated.meta.source_of(path);
        let locked = existing.map(|e| e.locked).unwrap_or(false) || source == Source::User;
        let reason = if !entry.human_reason.is_empty() {
            entry.human_reason.clone()
        } else if let Some(llm) = &entry.llm_validation {
            llm.reason.clone()
        } else {
            entry.deterministic_reason.clone()
        };
        resolved.insert(
            path.clone(),
            ResolvedField {
                key: path.clone(),
                value,
                status: entry.status,
                confidence: updated.meta.confidence.get(path).copied().unwrap_or(0.0),
                source,
                locked,
                requires_human_input: entry.requires_human_input,
                reason: Some(reason),
                suggestions: updated
                    .meta
                    .suggestions
                    .get(path)
                    .cloned()
                    .unwrap_or_default(),
                last_validated_at: Some(now_iso.clone()),
                version: existing.map(|e| e.version).unwrap_or(0) + 1,
            },
        );
    }
    updated.meta.resolved_fields = resolved;

    ResolveReport {
        llm_used,
        llm_error,
        fields,
        record: updated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use canonfill_core_types::{Conflict, FieldCandidate};
    use crate::intake::apply_candidate;
    use crate::confidence::MatchQuality;
    use crate::verdict::{FieldVerdict, LlmError};

    fn registry() -> FieldRegistry {
        FieldRegistry::builtin().unwrap()
    }

    fn seeded_record() -> CanonicalRecord {
        let mut record = CanonicalRecord::default();
        for (path, value, source) in [
            ("passport.surname", "Eriksson", Source::Mrz),
            ("passport.given_names", "Anna Maria", Source::Mrz),
            ("passport.passport_number", "L898902C3", Source::Mrz),
            ("passport.date_of_birth", "1974-08-12", Source::Mrz),
            ("passport.date_of_expiration", "2090-04-15", Source::Mrz),
            ("representation.attorney.family_name", "Smith", Source::Ocr),
            ("representation.attorney.given_name", "Jane", Source::Ocr),
            ("representation.attorney.email", "jane@example.com", Source::Ocr),
            ("representation.attorney.address.street", "42 Main St", Source::Ocr),
            ("representation.attorney.address.city", "Springfield", Source::Ocr),
            ("representation.attorney.address.state", "IL", Source::Ocr),
            ("representation.attorney.address.zip", "62704", Source::Ocr),
        ] {
            apply_candidate(
                &mut record,
                &FieldCandidate {
                    path: path.into(),
                    value: value.into(),
                    source,
                    evidence: None,
                    confidence: None,
                    presence: canonfill_core_types::Presence::Present,
                },
                MatchQuality::Exact,
            );
        }
        record
    }

    async fn run(
        record: &CanonicalRecord,
        autofill: &AutofillReport,
        port: Option<&dyn VerdictPort>,
        options: &ResolveOptions,
    ) -> ResolveReport {
        resolve_fields(&registry(), record, autofill, port, options).await
    }

    #[tokio::test]
    async fn valid_fields_go_green() {
        let report = run(
            &seeded_record(),
            &AutofillReport::default(),
            None,
            &ResolveOptions::default(),
        )
        .await;
        let entry = &report.fields["passport.surname"];
        assert_eq!(entry.status, Status::Green);
        assert_eq!(entry.issue_type, IssueType::Ok);
    }

    #[tokio::test]
    async fn missing_required_goes_red() {
        let mut record = seeded_record();
        record.set_value("passport.passport_number", None);
        record.meta.presence.insert(
            "passport.passport_number".into(),
            canonfill_core_types::Presence::Absent,
        );
        let report = run(
            &record,
            &AutofillReport::default(),
            None,
            &ResolveOptions::default(),
        )
        .await;
        let entry = &report.fields["passport.passport_number"];
        assert_eq!(entry.status, Status::Red);
        assert_eq!(entry.issue_type, IssueType::NotPresentInDoc);
        assert!(entry.requires_human_input);
    }

    #[tokio::test]
    async fn label_capture_is_red_suspect() {
        let mut record = seeded_record();
        record.set_value(
            "representation.attorney.email",
            Some("Email Address (if any)".into()),
        );
        let report = run(
            &record,
            &AutofillReport::default(),
            None,
            &ResolveOptions::default(),
        )
        .await;
        let entry = &report.fields["representation.attorney.email"];
        assert_eq!(entry.status, Status::Red);
        assert_eq!(entry.issue_type, IssueType::SuspectLabelCapture);
    }

    #[tokio::test]
    async fn conflict_floors_at_amber_and_is_never_green() {
        let mut record = seeded_record();
        record.set_value("representation.client.family_name", Some("Eriksson".into()));
        record.meta.sources.insert(
            "representation.client.family_name".into(),
            Source::Merge,
        );
        record.meta.conflicts.insert(
            "representation.client.family_name".into(),
            Conflict {
                field: "representation.client.family_name".into(),
                value_a: "Eriksson".into(),
                value_b: "Erikson".into(),
            },
        );
        let report = run(
            &record,
            &AutofillReport::default(),
            None,
            &ResolveOptions::default(),
        )
        .await;
        let entry = &report.fields["representation.client.family_name"];
        assert_eq!(entry.status, Status::Amber);
        assert_eq!(entry.issue_type, IssueType::Conflict);
        assert!(entry.requires_human_input);
        assert_eq!(
            entry.human_reason_category,
            HumanReasonCategory::ConflictSources
        );
    }

    #[tokio::test]
    async fn human_required_amber_when_missing() {
        let record = seeded_record();
        let report = run(
            &record,
            &AutofillReport::default(),
            None,
            &ResolveOptions::default(),
        )
        .await;
        let entry = &report.fields["representation.consent.client_signature_date"];
        assert_eq!(entry.status, Status::Amber);
        assert_eq!(entry.issue_type, IssueType::HumanRequired);
        assert_eq!(entry.human_reason_category, HumanReasonCategory::HumanConsent);
        assert!(entry.requires_human_input);
    }

    #[tokio::test]
    async fn autofill_failure_required_red_optional_amber() {
        let mut autofill = AutofillReport::default();
        autofill.field_results.insert(
            "passport.surname".into(),
            canonfill_core_types::AutofillFieldResult {
                attempted: true,
                result: Some(FillResult::Fail),
                failure_reason: Some(FailureReason::ReadbackMismatch),
                ..Default::default()
            },
        );
        autofill.field_results.insert(
            "passport.place_of_birth".into(),
            canonfill_core_types::AutofillFieldResult {
                attempted: true,
                result: Some(FillResult::Fail),
                failure_reason: Some(FailureReason::ReadbackMismatch),
                ..Default::default()
            },
        );
        let mut record = seeded_record();
        record.set_value("passport.place_of_birth", Some("Utopia City".into()));
        let report = run(&record, &autofill, None, &ResolveOptions::default()).await;
        assert_eq!(report.fields["passport.surname"].status, Status::Red);
        assert_eq!(
            report.fields["passport.surname"].issue_type,
            IssueType::AutofillFailed
        );
        assert_eq!(report.fields["passport.place_of_birth"].status, Status::Amber);
    }

    #[tokio::test]
    async fn locked_user_field_is_immutable() {
        let mut record = seeded_record();
        record.meta.resolved_fields.insert(
            "passport.surname".into(),
            ResolvedField {
                key: "passport.surname".into(),
                value: Some("Corrected-Name".into()),
                status: Status::Green,
                confidence: 1.0,
                source: Source::User,
                locked: true,
                requires_human_input: false,
                reason: Some("User confirmed.".into()),
                suggestions: Vec::new(),
                last_validated_at: None,
                version: 3,
            },
        );
        // Even a suspect extracted value cannot touch the locked entry.
        record.set_value("passport.surname", Some("Family Name".into()));
        let report = run(
            &record,
            &AutofillReport::default(),
            None,
            &ResolveOptions::default(),
        )
        .await;
        let resolved = &report.record.meta.resolved_fields["passport.surname"];
        assert_eq!(resolved.value.as_deref(), Some("Corrected-Name"));
        assert_eq!(resolved.status, Status::Green);
        assert_eq!(resolved.version, 3);
        assert!(resolved.last_validated_at.is_some());
    }

    #[tokio::test]
    async fn resolver_is_idempotent_on_value_and_status() {
        let record = seeded_record();
        let autofill = AutofillReport::default();
        let options = ResolveOptions::default();
        let first = run(&record, &autofill, None, &options).await;
        let second = run(&first.record, &autofill, None, &options).await;
        for (path, entry) in &first.fields {
            let again = &second.fields[path];
            assert_eq!(entry.status, again.status, "status drift on {path}");
            let v1 = &first.record.meta.resolved_fields[path];
            let v2 = &second.record.meta.resolved_fields[path];
            assert_eq!(v1.value, v2.value, "value drift on {path}");
            assert_eq!(v2.version, v1.version + 1);
        }
    }

    struct FixedPort(Vec<FieldVerdict>);

    #[async_trait]
    impl VerdictPort for FixedPort {
        async fn validate(
            &self,
            contexts: &[FieldContext],
        ) -> Result<Vec<FieldVerdict>, LlmError> {
            Ok(self
                .0
                .iter()
                .filter(|v| contexts.iter().any(|c| c.field == v.field))
                .cloned()
                .collect())
        }
    }

    #[tokio::test]
    async fn llm_cannot_rescue_deterministic_red() {
        let mut record = seeded_record();
        record.set_value(
            "representation.attorney.email",
            Some("Email Address (if any)".into()),
        );
        let port = FixedPort(vec![FieldVerdict {
            field: "representation.attorney.email".into(),
            verdict: Some(Status::Green),
            ..Default::default()
        }]);
        let options = ResolveOptions {
            use_llm: true,
            ..Default::default()
        };
        let report = run(&record, &AutofillReport::default(), Some(&port), &options).await;
        let entry = &report.fields["representation.attorney.email"];
        assert_eq!(entry.deterministic_status, Status::Red);
        assert_eq!(entry.status, Status::Red);
    }

    #[tokio::test]
    async fn llm_softens_green_by_one_step_only() {
        let record = seeded_record();
        let port = FixedPort(vec![FieldVerdict {
            field: "passport.surname".into(),
            verdict: Some(Status::Red),
            ..Default::default()
        }]);
        let options = ResolveOptions {
            use_llm: true,
            ..Default::default()
        };
        let report = run(&record, &AutofillReport::default(), Some(&port), &options).await;
        let entry = &report.fields["passport.surname"];
        assert_eq!(entry.deterministic_status, Status::Green);
        assert_eq!(entry.status, Status::Amber);
    }

    #[tokio::test]
    async fn ungrounded_suggestions_are_dropped() {
        let mut record = seeded_record();
        record.set_value("representation.attorney.address.state", Some("Illinois".into()));
        record.meta.evidence.insert(
            "representation.attorney.address.state".into(),
            "State: Illinois".into(),
        );
        let port = FixedPort(vec![FieldVerdict {
            field: "representation.attorney.address.state".into(),
            verdict: Some(Status::Amber),
            suggested_value: Some("Ohio".into()),
            evidence: Some("State: Illinois".into()),
            ..Default::default()
        }]);
        let options = ResolveOptions {
            use_llm: true,
            ..Default::default()
        };
        let report = run(&record, &AutofillReport::default(), Some(&port), &options).await;
        assert!(!report
            .record
            .meta
            .suggestions
            .get("representation.attorney.address.state")
            .map(|s| s.iter().any(|o| o.value == "Ohio"))
            .unwrap_or(false));
    }

    #[tokio::test]
    async fn grounded_suggestion_accepted_for_non_green() {
        let mut record = seeded_record();
        record.set_value("representation.attorney.address.state", Some("Illinoi".into()));
        record.meta.evidence.insert(
            "representation.attorney.address.state".into(),
            "State: Illinois 62704".into(),
        );
        let port = FixedPort(vec![FieldVerdict {
            field: "representation.attorney.address.state".into(),
            verdict: Some(Status::Amber),
            suggested_value: Some("Illinois".into()),
            evidence: Some("State: Illinois 62704".into()),
            ..Default::default()
        }]);
        let options = ResolveOptions {
            use_llm: true,
            ..Default::default()
        };
        let report = run(&record, &AutofillReport::default(), Some(&port), &options).await;
        let suggestions = &report.record.meta.suggestions["representation.attorney.address.state"];
        assert!(suggestions.iter().any(|s| s.value == "Illinois"));
    }

    #[tokio::test]
    async fn country_state_zip_cross_check_flags_country() {
        let mut record = seeded_record();
        record.set_value(
            "representation.attorney.address.country",
            Some("Canada".into()),
        );
        let report = run(
            &record,
            &AutofillReport::default(),
            None,
            &ResolveOptions::default(),
        )
        .await;
        let entry = &report.fields["representation.attorney.address.country"];
        assert_eq!(entry.status, Status::Amber);
        assert_eq!(entry.issue_type, IssueType::Conflict);
        assert!(entry.requires_human_input);
    }

    #[tokio::test]
    async fn non_canonical_usa_spelling_also_flags_country() {
        let mut record = seeded_record();
        record.set_value(
            "representation.attorney.address.country",
            Some("USA".into()),
        );
        let report = run(
            &record,
            &AutofillReport::default(),
            None,
            &ResolveOptions::default(),
        )
        .await;
        let entry = &report.fields["representation.attorney.address.country"];
        assert_eq!(entry.status, Status::Amber);
        assert_eq!(entry.issue_type, IssueType::Conflict);
        let suggestions =
            &report.record.meta.suggestions["representation.attorney.address.country"];
        assert!(suggestions.iter().any(|s| s.value == "United States"));
    }
}
