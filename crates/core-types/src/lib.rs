//! Shared types for the canonfill reconciliation and autofill crates.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Shared error type carried across crate boundaries.
#[derive(Debug, Error, Clone)]
pub enum CanonError {
    #[error("{message}")]
    Message { message: String },
}

impl CanonError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declared type of a canonical field; drives rule dispatch and fill strategy.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Name,
    DatePast,
    DateFuture,
    Email,
    Phone,
    State,
    Zip,
    PassportNumber,
    Sex,
    Text,
    Checkbox,
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Name => "name",
            FieldType::DatePast => "date_past",
            FieldType::DateFuture => "date_future",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::State => "state",
            FieldType::Zip => "zip",
            FieldType::PassportNumber => "passport_number",
            FieldType::Sex => "sex",
            FieldType::Text => "text",
            FieldType::Checkbox => "checkbox",
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, FieldType::DatePast | FieldType::DateFuture)
    }
}

/// Provenance tier of an extracted or resolved value.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Source {
    Mrz,
    Ocr,
    Llm,
    Ai,
    User,
    Merge,
    Passport,
    Validator,
    Unknown,
}

impl Source {
    pub fn name(&self) -> &'static str {
        match self {
            Source::Mrz => "MRZ",
            Source::Ocr => "OCR",
            Source::Llm => "LLM",
            Source::Ai => "AI",
            Source::User => "USER",
            Source::Merge => "MERGE",
            Source::Passport => "PASSPORT",
            Source::Validator => "VALIDATOR",
            Source::Unknown => "UNKNOWN",
        }
    }

    /// Locks from these sources freeze the resolved value permanently.
    pub fn is_human_or_ai(&self) -> bool {
        matches!(self, Source::User | Source::Ai)
    }
}

/// Traffic-light status of a resolved field.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Unknown,
    Green,
    Amber,
    Red,
}

impl Status {
    pub fn name(&self) -> &'static str {
        match self {
            Status::Unknown => "unknown",
            Status::Green => "green",
            Status::Amber => "amber",
            Status::Red => "red",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a field's label was seen in the source text, independent of a
/// captured value.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Present,
    Absent,
    #[default]
    Unknown,
}

/// One extracted value competing for a canonical field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldCandidate {
    pub path: String,
    pub value: String,
    pub source: Source,
    pub evidence: Option<String>,
    pub confidence: Option<f64>,
    #[serde(default)]
    pub presence: Presence,
}

/// An alternative value attached to a resolved field, never auto-applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuggestionOption {
    pub value: String,
    pub reason: Option<String>,
    pub source: Source,
    pub confidence: Option<f64>,
    pub evidence: Option<String>,
    #[serde(default)]
    pub requires_confirmation: bool,
}

/// Two credible sources disagreeing on one field after normalization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub field: String,
    pub value_a: String,
    pub value_b: String,
}

/// Issue classification produced by the deterministic pass.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    #[default]
    Ok,
    EmptyRequired,
    EmptyOptional,
    EmptyOptionalPresent,
    InvalidFormat,
    SuspectLabelCapture,
    Conflict,
    AutofillFailed,
    NotPresentInDoc,
    HumanRequired,
}

impl IssueType {
    pub fn name(&self) -> &'static str {
        match self {
            IssueType::Ok => "OK",
            IssueType::EmptyRequired => "EMPTY_REQUIRED",
            IssueType::EmptyOptional => "EMPTY_OPTIONAL",
            IssueType::EmptyOptionalPresent => "EMPTY_OPTIONAL_PRESENT",
            IssueType::InvalidFormat => "INVALID_FORMAT",
            IssueType::SuspectLabelCapture => "SUSPECT_LABEL_CAPTURE",
            IssueType::Conflict => "CONFLICT",
            IssueType::AutofillFailed => "AUTOFILL_FAILED",
            IssueType::NotPresentInDoc => "NOT_PRESENT_IN_DOC",
            IssueType::HumanRequired => "HUMAN_REQUIRED",
        }
    }
}

/// Why a field needs a human, bucketed for the review UI.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HumanReasonCategory {
    #[default]
    OptionalEmpty,
    MissingNotFound,
    ConflictSources,
    AutofillFailed,
    InvalidFormat,
    AmbiguousEvidence,
    HumanConsent,
}

/// Deterministic verdict mirrored into the coverage report.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeterministicVerdict {
    Verified,
    NeedsReview,
    MissingOrIncorrect,
}

impl DeterministicVerdict {
    pub fn from_status(status: Status) -> Self {
        match status {
            Status::Green => DeterministicVerdict::Verified,
            Status::Red => DeterministicVerdict::MissingOrIncorrect,
            Status::Amber | Status::Unknown => DeterministicVerdict::NeedsReview,
        }
    }
}

/// Outcome of the deterministic validation pass for one field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub status: Status,
    pub issue_type: IssueType,
    pub verdict: DeterministicVerdict,
    pub reason_codes: Vec<String>,
    pub reason: String,
    pub human_required: bool,
    pub human_reason_category: HumanReasonCategory,
    pub requires_human_input: bool,
}

/// Canonical, versioned snapshot of one field after a resolver pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolvedField {
    pub key: String,
    pub value: Option<String>,
    pub status: Status,
    pub confidence: f64,
    pub source: Source,
    pub locked: bool,
    pub requires_human_input: bool,
    pub reason: Option<String>,
    #[serde(default)]
    pub suggestions: Vec<SuggestionOption>,
    pub last_validated_at: Option<String>,
    #[serde(default)]
    pub version: u32,
}

impl ResolvedField {
    /// True when no later pass may touch value or status.
    pub fn frozen(&self) -> bool {
        self.locked && self.source.is_human_or_ai()
    }
}

/// Per-field outcome of one autofill run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FillResult {
    Pass,
    Fail,
    Skip,
}

/// Stable, machine-readable failure codes for autofill candidates.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    SelectorNotFound,
    NoMatch,
    NoSelectMatch,
    NoSelectOptions,
    NoRadioMatch,
    DuplicateTarget,
    CheckboxValueFalse,
    CheckboxInput,
    SubmitGuard,
    UnsupportedInput,
    PostFillEmpty,
    ReadbackMismatch,
    EmptyValue,
    NoValue,
    NoAutofillSpec,
    FillError,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::SelectorNotFound => "selector_not_found",
            FailureReason::NoMatch => "no_match",
            FailureReason::NoSelectMatch => "no_select_match",
            FailureReason::NoSelectOptions => "no_select_options",
            FailureReason::NoRadioMatch => "no_radio_match",
            FailureReason::DuplicateTarget => "duplicate_target",
            FailureReason::CheckboxValueFalse => "checkbox_value_false",
            FailureReason::CheckboxInput => "checkbox_input",
            FailureReason::SubmitGuard => "submit_guard",
            FailureReason::UnsupportedInput => "unsupported_input",
            FailureReason::PostFillEmpty => "post_fill_empty",
            FailureReason::ReadbackMismatch => "readback_mismatch",
            FailureReason::EmptyValue => "empty_value",
            FailureReason::NoValue => "no_value",
            FailureReason::NoAutofillSpec => "no_autofill_spec",
            FailureReason::FillError => "fill_error",
        }
    }

    /// Reasons that downgrade an optional field's failure to SKIP.
    pub fn downgrades_optional_to_skip(&self) -> bool {
        matches!(
            self,
            FailureReason::SelectorNotFound
                | FailureReason::NoMatch
                | FailureReason::NoSelectMatch
                | FailureReason::NoRadioMatch
                | FailureReason::DuplicateTarget
                | FailureReason::CheckboxValueFalse
        )
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selectable option as rendered in the live form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionItem {
    pub value: String,
    pub label: String,
}

/// Per-field record of what the executor attempted and observed.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AutofillFieldResult {
    pub attempted: bool,
    pub selector_used: Option<String>,
    pub dom_readback_value: Option<String>,
    pub result: Option<FillResult>,
    pub failure_reason: Option<FailureReason>,
    pub input_type: Option<String>,
    pub available_options: Option<Vec<OptionItem>>,
    pub selected_option: Option<OptionItem>,
}

/// Ephemeral, per-run fill target discovered from the live DOM.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormCandidate {
    pub label_text: String,
    pub locator: String,
}

/// How a not-filled form field is classified in the completeness scan.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletenessIssue {
    UnmappedRequired,
    UnmappedOptional,
    CanonicalMissing,
    AutofillMissed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompletenessEntry {
    pub label: String,
    pub input_type: Option<String>,
    pub required: bool,
    pub mapped_path: Option<String>,
    pub issue: CompletenessIssue,
}

/// What the live form still wants after a run: unmapped controls and
/// mapped-but-unfilled fields, split by requiredness.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FormCompleteness {
    pub required_not_filled: Vec<CompletenessEntry>,
    pub optional_not_filled: Vec<CompletenessEntry>,
    pub unmapped_required: Vec<CompletenessEntry>,
    pub unmapped_optional: Vec<CompletenessEntry>,
}

/// Full outcome of one autofill run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AutofillReport {
    pub filled_fields: Vec<String>,
    pub attempted_fields: Vec<String>,
    pub fill_failures: std::collections::BTreeMap<String, FailureReason>,
    pub dom_readback: std::collections::BTreeMap<String, Option<String>>,
    pub field_results: std::collections::BTreeMap<String, AutofillFieldResult>,
    pub form_completeness: Option<FormCompleteness>,
    pub duration_ms: u64,
    pub form_url: String,
    pub final_url: String,
    pub browser_kept_open: bool,
}

impl AutofillReport {
    pub fn entry(&self, path: &str) -> Option<&AutofillFieldResult> {
        self.field_results.get(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frozen_requires_lock_and_human_source() {
        let mut field = ResolvedField {
            key: "passport.surname".into(),
            value: Some("Eriksson".into()),
            status: Status::Green,
            confidence: 1.0,
            source: Source::User,
            locked: true,
            requires_human_input: false,
            reason: None,
            suggestions: Vec::new(),
            last_validated_at: None,
            version: 1,
        };
        assert!(field.frozen());
        field.source = Source::Ocr;
        assert!(!field.frozen());
        field.source = Source::Ai;
        field.locked = false;
        assert!(!field.frozen());
    }

    #[test]
    fn optional_skip_allow_list_is_closed() {
        assert!(FailureReason::DuplicateTarget.downgrades_optional_to_skip());
        assert!(FailureReason::CheckboxValueFalse.downgrades_optional_to_skip());
        assert!(!FailureReason::ReadbackMismatch.downgrades_optional_to_skip());
        assert!(!FailureReason::SubmitGuard.downgrades_optional_to_skip());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Status::Amber).unwrap(), "\"amber\"");
        assert_eq!(
            serde_json::to_string(&IssueType::SuspectLabelCapture).unwrap(),
            "\"SUSPECT_LABEL_CAPTURE\""
        );
    }
}
