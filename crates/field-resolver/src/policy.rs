//! Per-field policy for whether the LLM validation pass runs.

use canonfill_core_types::{FieldType, Presence, Status};
use canonfill_field_registry::FieldSpec;
use serde::{Deserialize, Serialize};

/// Scope of the LLM validation sweep.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmScope {
    All,
    #[default]
    Smart,
    IssuesOnly,
    RequiredOnly,
}

/// Everything the scope decision looks at for one field.
#[derive(Clone, Copy, Debug)]
pub struct ScopeInput {
    pub deterministic_status: Status,
    pub conflict: bool,
    pub autofill_failed: bool,
    pub presence: Presence,
    pub value_missing: bool,
    pub attempted: bool,
}

const HIGH_RISK_TYPES: &[FieldType] = &[
    FieldType::Name,
    FieldType::DatePast,
    FieldType::DateFuture,
    FieldType::PassportNumber,
    FieldType::Email,
    FieldType::Phone,
    FieldType::State,
    FieldType::Zip,
    FieldType::Sex,
];

/// Decide whether a field joins the LLM batch. Locked fields are excluded
/// by the engine before this runs.
pub fn should_invoke_llm(spec: &FieldSpec, input: ScopeInput, scope: LlmScope) -> bool {
    match scope {
        LlmScope::All => return true,
        LlmScope::IssuesOnly => {
            return input.conflict
                || input.autofill_failed
                || matches!(input.deterministic_status, Status::Amber | Status::Red);
        }
        LlmScope::RequiredOnly => return spec.required && !input.value_missing,
        LlmScope::Smart => {}
    }

    if spec.llm_always && !input.value_missing {
        return true;
    }
    if spec.human_required {
        return false;
    }
    if input.value_missing
        && !spec.required
        && input.presence == Presence::Absent
        && !input.attempted
    {
        return false;
    }
    if input.conflict
        || input.autofill_failed
        || matches!(input.deterministic_status, Status::Amber | Status::Red)
    {
        return true;
    }
    if input.attempted {
        return true;
    }
    if spec.required && !input.value_missing {
        return true;
    }
    !input.value_missing && HIGH_RISK_TYPES.contains(&spec.field_type)
}
