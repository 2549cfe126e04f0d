//! Cross-source and cross-field reconciliation passes.

use std::collections::BTreeMap;

use canonfill_core_types::{
    Conflict, DeterministicVerdict, HumanReasonCategory, IssueType, Presence, ResolvedField,
    Source, Status,
};
use canonfill_field_registry::CanonicalRecord;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::engine::FieldReportEntry;
use crate::intake::add_suggestion;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn conflict_key(value: &str) -> String {
    WHITESPACE
        .replace_all(value.trim(), " ")
        .to_lowercase()
}

const IDENTITY_MAPPINGS: &[(&str, &str)] = &[
    ("passport.surname", "representation.client.family_name"),
    ("passport.given_names", "representation.client.given_name"),
    ("passport.full_name", "representation.client.full_name"),
];

/// Copy passport identity onto empty client fields; where the form's OCR
/// disagrees with the passport, record a conflict instead of picking a
/// winner. The passport value becomes the working value, the form's value a
/// confirmation-required suggestion.
pub fn merge_identity_fields(record: &mut CanonicalRecord) {
    let mrz_present = record
        .meta
        .presence
        .iter()
        .any(|(path, presence)| path.starts_with("passport.") && *presence == Presence::Present)
        && record
            .meta
            .sources
            .values()
            .any(|source| *source == Source::Mrz);
    if !mrz_present {
        return;
    }
    let now_iso = Utc::now().to_rfc3339();
    for (passport_path, client_path) in IDENTITY_MAPPINGS {
        let Some(passport_value) = record.value(passport_path) else {
            continue;
        };
        let client_value = record.value(client_path);
        match client_value {
            Some(client_value) if !client_value.trim().is_empty() => {
                if conflict_key(&passport_value) == conflict_key(&client_value) {
                    continue;
                }
                debug!(field = %client_path, "identity conflict between passport and form");
                record.meta.conflicts.insert(
                    (*client_path).to_string(),
                    Conflict {
                        field: (*client_path).to_string(),
                        value_a: passport_value.clone(),
                        value_b: client_value.clone(),
                    },
                );
                record.meta.add_warning(
                    "conflict",
                    "Conflict between passport and representation form",
                    Some(client_path),
                );
                record
                    .meta
                    .status
                    .insert((*client_path).to_string(), Status::Amber);
                let version = record
                    .meta
                    .resolved_fields
                    .get(*client_path)
                    .map(|e| e.version)
                    .unwrap_or(0)
                    + 1;
                record.meta.resolved_fields.insert(
                    (*client_path).to_string(),
                    ResolvedField {
                        key: (*client_path).to_string(),
                        value: Some(passport_value.clone()),
                        status: Status::Amber,
                        confidence: 0.7,
                        source: Source::Merge,
                        locked: false,
                        requires_human_input: true,
                        reason: Some("Conflict between passport and representation form.".into()),
                        suggestions: record
                            .meta
                            .suggestions
                            .get(*client_path)
                            .cloned()
                            .unwrap_or_default(),
                        last_validated_at: Some(now_iso.clone()),
                        version,
                    },
                );
                let evidence = record.meta.evidence.get(*client_path).cloned();
                add_suggestion(
                    record,
                    client_path,
                    &client_value,
                    Some("Representation form value"),
                    Source::Ocr,
                    None,
                    evidence.as_deref(),
                    true,
                );
                let passport_evidence = record.meta.evidence.get(*passport_path).cloned();
                record.set_value(client_path, Some(passport_value.clone()));
                record
                    .meta
                    .sources
                    .insert((*client_path).to_string(), Source::Merge);
                if let Some(evidence) = passport_evidence {
                    record
                        .meta
                        .evidence
                        .insert((*client_path).to_string(), evidence);
                }
            }
            _ => {
                let passport_evidence = record.meta.evidence.get(*passport_path).cloned();
                record.set_value(client_path, Some(passport_value.clone()));
                record
                    .meta
                    .sources
                    .insert((*client_path).to_string(), Source::Passport);
                record.meta.confidence.insert(
                    (*client_path).to_string(),
                    crate::confidence::estimate_confidence(
                        Source::Passport,
                        Some(&passport_value),
                        passport_evidence.as_deref(),
                        crate::confidence::MatchQuality::Exact,
                    ),
                );
                if let Some(evidence) = passport_evidence {
                    record
                        .meta
                        .evidence
                        .insert((*client_path).to_string(), evidence);
                }
            }
        }
    }
}

const COUNTRY_CHECK_PATH: &str = "representation.attorney.address.country";

/// A US-shaped state+ZIP pair demands the canonical "United States"
/// country; anything else on the country field (a non-US country, or a
/// non-canonical spelling like "USA") is a conflict needing confirmation.
/// Runs after all per-field passes.
pub fn cross_field_country_check(
    fields: &mut BTreeMap<String, FieldReportEntry>,
    record: &mut CanonicalRecord,
) {
    let address = &record.representation.attorney.address;
    let (Some(state), Some(zip), Some(country)) =
        (&address.state, &address.zip, &address.country)
    else {
        return;
    };
    let state_ok = state.trim().len() == 2;
    let zip_ok = !zip.trim().is_empty() && zip.trim().chars().all(|c| c.is_ascii_digit());
    if !(state_ok && zip_ok) || country.trim().to_lowercase() == "united states" {
        return;
    }
    let Some(entry) = fields.get_mut(COUNTRY_CHECK_PATH) else {
        return;
    };
    entry.status = Status::Amber;
    entry.deterministic_status = Status::Amber;
    entry.deterministic_verdict = DeterministicVerdict::NeedsReview;
    entry.issue_type = IssueType::Conflict;
    entry.deterministic_reason = "Country conflicts with US state/ZIP.".into();
    entry.deterministic_codes.push("country_conflict".into());
    entry.requires_human_input = true;
    entry.human_reason_category = HumanReasonCategory::ConflictSources;
    entry.human_reason = "Conflict between country and state/ZIP.".into();
    entry.human_action = "Confirm the correct country.".into();
    add_suggestion(
        record,
        COUNTRY_CHECK_PATH,
        "United States",
        Some("US state/ZIP detected"),
        Source::Validator,
        Some(0.6),
        None,
        true,
    );
}
