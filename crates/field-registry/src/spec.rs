use canonfill_core_types::FieldType;
use serde::{Deserialize, Serialize};

/// How a field participates in autofill: ordered label hints for the target
/// form and a stable fill order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutofillSpec {
    pub labels: Vec<String>,
    pub order: u32,
}

/// Static declaration of one canonical field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldSpec {
    pub key: String,
    pub group: String,
    pub field_type: FieldType,
    pub required: bool,
    pub label: String,
    #[serde(default)]
    pub label_hints: Vec<String>,
    #[serde(default)]
    pub autofill: Option<AutofillSpec>,
    /// Included in the deterministic validation sweep.
    #[serde(default)]
    pub validate: bool,
    /// Attestation/consent fields that must never be auto-populated.
    #[serde(default)]
    pub human_required: bool,
    #[serde(default)]
    pub human_required_reason: Option<String>,
    /// Policy flag: always include this field in the LLM validation pass.
    #[serde(default)]
    pub llm_always: bool,
}

impl FieldSpec {
    pub fn new(
        key: &str,
        group: &str,
        field_type: FieldType,
        required: bool,
        label: &str,
    ) -> Self {
        Self {
            key: key.to_string(),
            group: group.to_string(),
            field_type,
            required,
            label: label.to_string(),
            label_hints: Vec::new(),
            autofill: None,
            validate: false,
            human_required: false,
            human_required_reason: None,
            llm_always: false,
        }
    }

    pub fn hints(mut self, hints: &[&str]) -> Self {
        self.label_hints = hints.iter().map(|h| h.to_string()).collect();
        self
    }

    pub fn autofill(mut self, labels: &[&str], order: u32) -> Self {
        self.autofill = Some(AutofillSpec {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            order,
        });
        self
    }

    pub fn validated(mut self) -> Self {
        self.validate = true;
        self
    }

    pub fn human_required(mut self, reason: &str) -> Self {
        self.human_required = true;
        self.human_required_reason = Some(reason.to_string());
        self
    }

    pub fn llm_always(mut self) -> Self {
        self.llm_always = true;
        self
    }
}
