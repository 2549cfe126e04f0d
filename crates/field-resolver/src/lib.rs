//! The reconciliation core: confidence scoring, the per-field status
//! engine, conflict handling, and the bounded LLM verdict merge.
//!
//! Reconciliation is synchronous and pure per field; the only async surface
//! is the batched [`VerdictPort`] call, whose failures degrade to
//! deterministic-only status with a warning.

pub mod confidence;
pub mod engine;
pub mod intake;
pub mod merge;
pub mod policy;
pub mod review;
pub mod verdict;

pub use confidence::{base_confidence_for_source, estimate_confidence, MatchQuality};
pub use engine::{
    resolve_fields, FieldReportEntry, LlmValidation, ResolveOptions, ResolveReport,
};
pub use intake::{add_suggestion, apply_candidate};
pub use merge::{cross_field_country_check, merge_identity_fields};
pub use policy::{should_invoke_llm, LlmScope, ScopeInput};
pub use review::{summarize_review, ReviewSummary};
pub use verdict::{
    final_status, suggestion_grounded, trivial_normalization, BatchPolicy, ContextLimits,
    FieldContext, FieldVerdict, LlmError, VerdictPort,
};
