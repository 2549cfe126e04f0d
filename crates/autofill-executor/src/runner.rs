//! Drives one autofill run: rank, fill, verify, classify.

use std::collections::BTreeSet;
use std::time::Instant;

use canonfill_core_types::{
    AutofillFieldResult, AutofillReport, CompletenessEntry, CompletenessIssue, FailureReason,
    FillResult, FormCandidate, FormCompleteness, OptionItem,
};
use canonfill_field_registry::{CanonicalRecord, FieldRegistry, FieldSpec};
use tracing::{debug, info, instrument, warn};

use autofill_matcher::{is_submit_like, normalized_similarity, rank_candidates, MIN_SCORE};

use crate::errors::AutofillError;
use crate::model::{ElementKind, ReadbackDetails, ScannedField};
use crate::ports::BrowserPort;
use crate::readback::{matches_expected, normalize_for_input, read_back};
use crate::strategies::{
    match_radio_option, match_select_option, parse_unit_value, should_check_checkbox, UnitKind,
};

/// Options for one run.
#[derive(Clone, Debug)]
pub struct AutofillOptions {
    pub form_url: String,
    /// Leave the session open for manual follow-up; release is deferred to
    /// the session's own lifecycle, not this call.
    pub keep_open: bool,
}

/// Outcome of folding one field's ranked candidates.
struct FoldOutcome {
    filled: bool,
    attempted: bool,
    selector_used: Option<String>,
    readback_value: Option<String>,
    details: ReadbackDetails,
    available_options: Option<Vec<OptionItem>>,
    last_reason: FailureReason,
}

fn classify(required: bool, reason: FailureReason) -> FillResult {
    if !required && reason.downgrades_optional_to_skip() {
        FillResult::Skip
    } else {
        FillResult::Fail
    }
}

/// Fold over ranked candidates until one verified write succeeds.
///
/// Every DOM error is scoped to the candidate that raised it; the fold
/// carries the last failure reason forward so the field's classification
/// can branch on it deterministically.
async fn fold_candidates(
    port: &dyn BrowserPort,
    ranked: &[autofill_matcher::RankedCandidate],
    value: &str,
    used: &mut BTreeSet<String>,
) -> FoldOutcome {
    let mut outcome = FoldOutcome {
        filled: false,
        attempted: false,
        selector_used: None,
        readback_value: None,
        details: ReadbackDetails::default(),
        available_options: None,
        last_reason: FailureReason::NoMatch,
    };

    for candidate in ranked {
        if !candidate.eligible() {
            break;
        }
        let FormCandidate {
            label_text,
            locator,
        } = &candidate.candidate;
        if is_submit_like(label_text) {
            outcome.last_reason = FailureReason::SubmitGuard;
            continue;
        }
        if used.contains(locator) {
            outcome.last_reason = FailureReason::DuplicateTarget;
            continue;
        }
        let probe = match port.probe(locator).await {
            Ok(probe) => probe,
            Err(err) => {
                debug!(locator = %locator, error = %err, "probe failed");
                outcome.last_reason = FailureReason::FillError;
                continue;
            }
        };
        let kind = probe.kind();
        outcome.details.input_type = Some(kind.input_type_label().to_string());
        match kind {
            ElementKind::Action => {
                outcome.last_reason = FailureReason::SubmitGuard;
                continue;
            }
            ElementKind::Unsupported => {
                outcome.last_reason = FailureReason::UnsupportedInput;
                continue;
            }
            _ => {}
        }
        let value_for_fill = normalize_for_input(value, kind.input_type_label())
            .unwrap_or_else(|| value.to_string());
        // What the DOM must hold afterwards; for option controls this is the
        // matched option, not the raw canonical text.
        let mut verify_value = value_for_fill.clone();

        let write = match &kind {
            ElementKind::Checkbox => {
                if !should_check_checkbox(&value_for_fill) {
                    outcome.last_reason = FailureReason::CheckboxValueFalse;
                    continue;
                }
                outcome.attempted = true;
                port.set_checked(locator).await
            }
            ElementKind::Select => {
                let options = port.select_options(locator).await.unwrap_or_default();
                outcome.available_options = Some(options.clone());
                outcome.attempted = true;
                match match_select_option(&value_for_fill, &options) {
                    Ok(matched) => {
                        let (by, target) = matched.target();
                        verify_value = target.to_string();
                        if by == "value" {
                            port.select_by_value(locator, target).await
                        } else {
                            port.select_by_label(locator, target).await
                        }
                    }
                    Err(reason) => {
                        outcome.last_reason = reason;
                        continue;
                    }
                }
            }
            ElementKind::Radio => {
                let group = port.radio_group(locator).await.unwrap_or_default();
                outcome.available_options = Some(group.clone());
                outcome.attempted = true;
                match match_radio_option(&value_for_fill, &group) {
                    Ok(option) => {
                        verify_value = if option.value.is_empty() {
                            option.label.clone()
                        } else {
                            option.value.clone()
                        };
                        port.check_radio_value(locator, &option.value).await
                    }
                    Err(reason) => {
                        outcome.last_reason = reason;
                        continue;
                    }
                }
            }
            ElementKind::Text { .. } | ElementKind::TextArea => {
                outcome.attempted = true;
                port.fill_text(locator, &value_for_fill).await
            }
            ElementKind::Action | ElementKind::Unsupported => unreachable!(),
        };
        if let Err(err) = write {
            debug!(locator = %locator, error = %err, "write failed");
            outcome.last_reason = FailureReason::FillError;
            continue;
        }

        let (readback_value, details) = match read_back(port, locator, &kind).await {
            Ok(result) => result,
            Err(err) => {
                debug!(locator = %locator, error = %err, "readback failed");
                outcome.last_reason = FailureReason::FillError;
                continue;
            }
        };
        if readback_value
            .as_deref()
            .map(|v| v.trim().is_empty())
            .unwrap_or(true)
            && details.checked != Some(true)
        {
            outcome.last_reason = FailureReason::PostFillEmpty;
            continue;
        }
        if !matches_expected(&verify_value, readback_value.as_deref(), &details) {
            outcome.last_reason = FailureReason::ReadbackMismatch;
            continue;
        }

        used.insert(locator.clone());
        outcome.filled = true;
        outcome.selector_used = Some(locator.clone());
        outcome.readback_value = readback_value;
        outcome.details = details;
        break;
    }

    outcome
}

/// The destination form may model the unit either as a designator checkbox
/// plus a number input, or as designator text inputs; try both shapes and
/// fill an adjoining unit-number input when present.
async fn fill_unit_field(
    port: &dyn BrowserPort,
    value: &str,
) -> AutofillFieldResult {
    let (unit_kind, unit_number) = parse_unit_value(value);
    let designator = unit_kind.unwrap_or(UnitKind::Apt).as_str();
    let number_value = unit_number.unwrap_or_else(|| value.trim().to_string());

    let mut attempted = false;
    let mut filled = false;
    let mut selectors: Vec<String> = Vec::new();
    let mut failure: Option<FailureReason> = None;
    let mut readback_value: Option<String> = None;
    let mut input_type: Option<String> = None;

    let checkbox_locator = format!(
        "input[type='checkbox']#{designator}, input[type='checkbox'][value='{designator}']"
    );
    if port.exists(&checkbox_locator).await.unwrap_or(false) {
        attempted = true;
        input_type = Some("checkbox".into());
        match port.set_checked(&checkbox_locator).await {
            Ok(()) => {
                filled = true;
                selectors.push(format!("#{designator}"));
                readback_value = Some(designator.to_string());
            }
            Err(err) => {
                debug!(error = %err, "unit checkbox write failed");
                failure = Some(FailureReason::FillError);
            }
        }
    } else {
        let text_locator =
            format!("input[type='text']#{designator}, input[type='text'][name='{designator}']");
        if port.exists(&text_locator).await.unwrap_or(false) && !number_value.is_empty() {
            attempted = true;
            input_type = Some("text".into());
            match port.fill_text(&text_locator, &number_value).await {
                Ok(()) => {
                    filled = true;
                    selectors.push(format!("#{designator}"));
                    readback_value = port
                        .read_value(&text_locator)
                        .await
                        .ok()
                        .flatten()
                        .or(Some(number_value.clone()));
                }
                Err(err) => {
                    debug!(error = %err, "unit text write failed");
                    failure = Some(FailureReason::FillError);
                }
            }
        }
    }

    if !number_value.is_empty() {
        let number_locator =
            "input[type='text']#apt-number, input[type='text'][name='apt-number']";
        if port.exists(number_locator).await.unwrap_or(false) {
            attempted = true;
            input_type = Some("text".into());
            match port.fill_text(number_locator, &number_value).await {
                Ok(()) => {
                    filled = true;
                    selectors.push("#apt-number".into());
                    readback_value = port
                        .read_value(number_locator)
                        .await
                        .ok()
                        .flatten()
                        .or(Some(number_value.clone()));
                }
                Err(err) => {
                    debug!(error = %err, "unit number write failed");
                    failure = Some(FailureReason::FillError);
                }
            }
        }
    }

    if !filled && failure.is_none() {
        failure = Some(FailureReason::SelectorNotFound);
    }

    AutofillFieldResult {
        attempted,
        selector_used: if selectors.is_empty() {
            None
        } else {
            Some(selectors.join(", "))
        },
        dom_readback_value: readback_value,
        result: None,
        failure_reason: if filled { None } else { failure },
        input_type,
        available_options: None,
        selected_option: None,
    }
}

fn best_target_match(field: &ScannedField, targets: &[&FieldSpec]) -> (Option<String>, f64) {
    let mut best_score = 0.0;
    let mut best_path = None;
    for target in targets {
        let Some(autofill) = &target.autofill else {
            continue;
        };
        for candidate in field.label_candidates() {
            for label in &autofill.labels {
                let score = normalized_similarity(label, candidate);
                if score > best_score {
                    best_score = score;
                    best_path = Some(target.key.clone());
                }
            }
        }
    }
    (best_path, best_score)
}

const UNMAPPED_FAILURES: &[FailureReason] = &[
    FailureReason::UnsupportedInput,
    FailureReason::CheckboxInput,
    FailureReason::SubmitGuard,
];

fn build_form_completeness(
    targets: &[&FieldSpec],
    record: &CanonicalRecord,
    form_fields: &[ScannedField],
    report: &AutofillReport,
) -> FormCompleteness {
    let mut completeness = FormCompleteness::default();

    for target in targets {
        let path = target.key.as_str();
        let entry = report.field_results.get(path);
        let result = entry.and_then(|e| e.result);
        let failure = entry.and_then(|e| e.failure_reason);
        let input_type = entry.and_then(|e| e.input_type.clone());
        let filled = result == Some(FillResult::Pass);
        let canonical_missing = record
            .fill_value(path)
            .map(|v| v.trim().is_empty())
            .unwrap_or(true);
        if filled {
            continue;
        }
        if let Some(failure) = failure.filter(|f| UNMAPPED_FAILURES.contains(f)) {
            let entry = CompletenessEntry {
                label: path.to_string(),
                input_type: input_type.clone(),
                required: target.required,
                mapped_path: None,
                issue: if target.required {
                    CompletenessIssue::UnmappedRequired
                } else {
                    CompletenessIssue::UnmappedOptional
                },
            };
            debug!(path, failure = %failure, "target unmapped on this form");
            if target.required {
                completeness.unmapped_required.push(entry);
            } else {
                completeness.unmapped_optional.push(entry);
            }
        } else if canonical_missing {
            if target.required {
                completeness.required_not_filled.push(CompletenessEntry {
                    label: path.to_string(),
                    input_type,
                    required: true,
                    mapped_path: Some(path.to_string()),
                    issue: CompletenessIssue::CanonicalMissing,
                });
            }
        } else {
            let entry = CompletenessEntry {
                label: path.to_string(),
                input_type,
                required: target.required,
                mapped_path: Some(path.to_string()),
                issue: CompletenessIssue::AutofillMissed,
            };
            if target.required {
                completeness.required_not_filled.push(entry);
            } else {
                completeness.optional_not_filled.push(entry);
            }
        }
    }

    for field in form_fields {
        let (mapped_path, score) = best_target_match(field, targets);
        if mapped_path.is_some() && score >= 0.9 {
            continue;
        }
        if field.is_filled() {
            continue;
        }
        let label = field
            .label_candidates()
            .first()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "Unmapped field".to_string());
        let entry = CompletenessEntry {
            label,
            input_type: Some(field.input_type.clone()),
            required: field.required,
            mapped_path: None,
            issue: if field.required {
                CompletenessIssue::UnmappedRequired
            } else {
                CompletenessIssue::UnmappedOptional
            },
        };
        if field.required {
            completeness.unmapped_required.push(entry);
        } else {
            completeness.unmapped_optional.push(entry);
        }
    }

    completeness
}

/// One full, strictly sequential autofill run.
///
/// A navigation failure is the sole fatal outcome and propagates as an
/// error; the caller reports empty outcome sets. Identical input against an
/// unchanged form yields identical attempted/filled/failure sets.
#[instrument(skip_all, fields(form_url = %options.form_url))]
pub async fn run_autofill(
    registry: &FieldRegistry,
    record: &CanonicalRecord,
    port: &dyn BrowserPort,
    options: &AutofillOptions,
) -> Result<AutofillReport, AutofillError> {
    let start = Instant::now();
    port.navigate(&options.form_url).await?;

    let mut candidates = port.collect_candidates().await.unwrap_or_else(|err| {
        warn!(error = %err, "candidate discovery failed; continuing with none");
        Vec::new()
    });
    // Stable order for deterministic matching.
    candidates.sort_by(|a, b| {
        a.label_text
            .to_lowercase()
            .cmp(&b.label_text.to_lowercase())
            .then_with(|| a.locator.cmp(&b.locator))
    });
    info!(candidates = candidates.len(), "form candidates discovered");
    let form_fields = port.scan_form_fields().await.unwrap_or_else(|err| {
        warn!(error = %err, "form scan failed");
        Vec::new()
    });

    let mut report = AutofillReport {
        form_url: options.form_url.clone(),
        browser_kept_open: options.keep_open,
        ..Default::default()
    };
    let mut used: BTreeSet<String> = BTreeSet::new();
    let targets = registry.iter_autofill();

    for target in &targets {
        let path = target.key.as_str();
        let required = target.required;
        let Some(value) = record
            .fill_value(path)
            .filter(|v| !v.trim().is_empty())
        else {
            report.field_results.insert(
                path.to_string(),
                AutofillFieldResult {
                    result: Some(FillResult::Skip),
                    failure_reason: Some(FailureReason::NoValue),
                    ..Default::default()
                },
            );
            debug!(path, "skip: no value");
            continue;
        };

        if path.ends_with("address.unit") {
            let mut unit = fill_unit_field(port, &value).await;
            let filled = unit.failure_reason.is_none();
            unit.result = Some(if filled {
                FillResult::Pass
            } else {
                classify(required, unit.failure_reason.unwrap_or(FailureReason::FillError))
            });
            if unit.attempted {
                report.attempted_fields.push(path.to_string());
            }
            if filled {
                report.filled_fields.push(path.to_string());
            }
            if let Some(readback) = &unit.dom_readback_value {
                report
                    .dom_readback
                    .insert(path.to_string(), Some(readback.clone()));
            }
            if unit.result == Some(FillResult::Fail) {
                if let Some(reason) = unit.failure_reason {
                    report.fill_failures.insert(path.to_string(), reason);
                }
            }
            report.field_results.insert(path.to_string(), unit);
            continue;
        }

        let labels = target
            .autofill
            .as_ref()
            .map(|a| a.labels.clone())
            .unwrap_or_default();
        let ranked = rank_candidates(&candidates, &labels);
        if ranked.first().map(|r| r.score < MIN_SCORE).unwrap_or(true) {
            let reason = FailureReason::SelectorNotFound;
            let result = classify(required, reason);
            if result == FillResult::Fail {
                report.fill_failures.insert(path.to_string(), reason);
            }
            report.field_results.insert(
                path.to_string(),
                AutofillFieldResult {
                    result: Some(result),
                    failure_reason: Some(reason),
                    ..Default::default()
                },
            );
            debug!(path, "skip: no candidate above threshold");
            continue;
        }

        for ranked_candidate in ranked.iter().take(5).filter(|r| r.eligible()) {
            debug!(
                path,
                score = ranked_candidate.score,
                label = %ranked_candidate.candidate.label_text,
                locator = %ranked_candidate.candidate.locator,
                "candidate"
            );
        }

        let outcome = fold_candidates(port, &ranked, &value, &mut used).await;
        if outcome.attempted {
            report.attempted_fields.push(path.to_string());
        }
        report
            .dom_readback
            .insert(path.to_string(), outcome.readback_value.clone());

        if outcome.filled {
            info!(path, selector = outcome.selector_used.as_deref().unwrap_or(""), "filled");
            report.field_results.insert(
                path.to_string(),
                AutofillFieldResult {
                    attempted: true,
                    selector_used: outcome.selector_used,
                    dom_readback_value: outcome.readback_value,
                    result: Some(FillResult::Pass),
                    failure_reason: None,
                    input_type: outcome.details.input_type.clone(),
                    available_options: outcome.available_options,
                    selected_option: outcome.details.selected_option.clone(),
                },
            );
            report.filled_fields.push(path.to_string());
            continue;
        }

        let reason = if outcome.last_reason == FailureReason::NoMatch {
            FailureReason::SelectorNotFound
        } else {
            outcome.last_reason
        };
        let result = classify(required, reason);
        if result == FillResult::Fail {
            report.fill_failures.insert(path.to_string(), reason);
        }
        debug!(path, reason = %reason, "not filled");
        report.field_results.insert(
            path.to_string(),
            AutofillFieldResult {
                attempted: outcome.attempted,
                selector_used: outcome.selector_used,
                dom_readback_value: outcome.readback_value,
                result: Some(result),
                failure_reason: Some(reason),
                input_type: outcome.details.input_type.clone(),
                available_options: outcome.available_options,
                selected_option: outcome.details.selected_option.clone(),
            },
        );
    }

    report.final_url = port.current_url().await.unwrap_or_default();
    report.form_completeness = Some(build_form_completeness(
        &targets,
        record,
        &form_fields,
        &report,
    ));
    report.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        attempted = report.attempted_fields.len(),
        filled = report.filled_fields.len(),
        failures = report.fill_failures.len(),
        duration_ms = report.duration_ms,
        "autofill complete"
    );
    Ok(report)
}
