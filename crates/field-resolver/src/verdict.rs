//! The LLM collaborator boundary: request contexts, verdict types, bounded
//! status merge, grounding checks, and token-budget batching.
//!
//! The network client itself lives behind [`VerdictPort`]; everything here
//! treats it as a function from contexts to same-order verdicts. Any
//! malformed response or transport failure is a clean, non-fatal error.

use std::collections::BTreeMap;

use async_trait::async_trait;
use canonfill_core_types::Status;
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, Clone)]
pub enum LlmError {
    #[error("LLM disabled")]
    Disabled,
    #[error("LLM endpoint not configured")]
    NotConfigured,
    #[error("LLM request failed: {0}")]
    Transport(String),
    #[error("LLM returned malformed response: {0}")]
    MalformedResponse(String),
}

/// One field's context shipped to the LLM for validation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldContext {
    pub field: String,
    pub label: String,
    pub expected_type: String,
    pub extracted_value: String,
    pub dom_readback_value: String,
    pub evidence: String,
    pub presence: String,
    pub deterministic_status: String,
    pub deterministic_reason_codes: Vec<String>,
    pub deterministic_reason: String,
    pub deterministic_issue_type: String,
    pub human_required: bool,
    pub human_required_reason: String,
}

/// One field's verdict coming back from the LLM.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FieldVerdict {
    pub field: String,
    pub verdict: Option<Status>,
    pub score: Option<f64>,
    #[serde(default)]
    pub reason: String,
    pub suggested_value: Option<String>,
    #[serde(default)]
    pub suggested_value_reason: String,
    pub evidence: Option<String>,
    #[serde(default)]
    pub requires_human_input: bool,
}

/// Boundary to the external LLM validator.
#[async_trait]
pub trait VerdictPort: Send + Sync {
    async fn validate(&self, contexts: &[FieldContext]) -> Result<Vec<FieldVerdict>, LlmError>;
}

/// Truncation limits applied to every string shipped in a context.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ContextLimits {
    pub label_max_chars: usize,
    pub value_max_chars: usize,
    pub evidence_max_chars: usize,
    pub reason_max_chars: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            label_max_chars: 80,
            value_max_chars: 120,
            evidence_max_chars: 320,
            reason_max_chars: 160,
        }
    }
}

/// Token-budget batching knobs.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BatchPolicy {
    pub target_tokens: usize,
    pub output_tokens_per_field: usize,
    /// Fixed batch size; zero means derive from the token budget.
    pub batch_size: usize,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            target_tokens: 3500,
            output_tokens_per_field: 40,
            batch_size: 0,
        }
    }
}

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]").unwrap());

/// Collapse whitespace and clip to a character budget.
pub fn clip_text(value: &str, limit: usize) -> String {
    let text = WHITESPACE.replace_all(value.trim(), " ").to_string();
    if text.chars().count() <= limit {
        return text;
    }
    let clipped: String = text.chars().take(limit).collect();
    format!("{}…", clipped.trim_end())
}

/// Rough token estimate: four characters per token, minimum one.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    (text.len() / 4).max(1)
}

fn estimate_context_tokens(contexts: &[FieldContext], policy: &BatchPolicy) -> usize {
    let payload = serde_json::to_string(contexts).unwrap_or_default();
    estimate_tokens(&payload) + policy.output_tokens_per_field * contexts.len()
}

/// Derive a batch size from the token budget; zero means "one batch".
fn auto_batch_size(contexts: &[FieldContext], policy: &BatchPolicy) -> usize {
    if contexts.is_empty() {
        return 0;
    }
    let est = estimate_context_tokens(contexts, policy);
    if est <= policy.target_tokens {
        return 0;
    }
    let per_item = (est / contexts.len()).max(1);
    let batch = (policy.target_tokens / per_item).max(5).min(contexts.len());
    if batch >= contexts.len() {
        0
    } else {
        batch
    }
}

fn chunk_contexts(contexts: Vec<FieldContext>, batch_size: usize) -> Vec<Vec<FieldContext>> {
    if batch_size == 0 {
        return vec![contexts];
    }
    let mut chunks = Vec::new();
    let mut iter = contexts.into_iter().peekable();
    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(batch_size).collect());
    }
    chunks
}

/// Run all batches concurrently and merge verdicts back by field path.
///
/// A failing batch contributes a warning, never an abort: its fields simply
/// keep their deterministic status. Returns the verdict map plus a
/// deduplicated error summary.
pub async fn run_batched(
    port: &dyn VerdictPort,
    contexts: Vec<FieldContext>,
    policy: &BatchPolicy,
) -> (BTreeMap<String, FieldVerdict>, Option<String>) {
    if contexts.is_empty() {
        return (BTreeMap::new(), None);
    }
    let batch_size = if policy.batch_size > 0 {
        policy.batch_size
    } else {
        auto_batch_size(&contexts, policy)
    };
    let batches = chunk_contexts(contexts, batch_size);
    let results = join_all(batches.iter().map(|batch| port.validate(batch))).await;

    let mut verdicts = BTreeMap::new();
    let mut errors: Vec<String> = Vec::new();
    for result in results {
        match result {
            Ok(items) => {
                for item in items {
                    if item.field.is_empty() {
                        continue;
                    }
                    verdicts.insert(item.field.clone(), item);
                }
            }
            Err(err) => {
                let message = err.to_string();
                warn!(error = %message, "LLM validation batch failed");
                if !errors.contains(&message) {
                    errors.push(message);
                }
            }
        }
    }
    let error = if errors.is_empty() {
        None
    } else {
        Some(errors.join("; "))
    };
    (verdicts, error)
}

/// Asymmetric merge of deterministic status and LLM verdict.
///
/// The LLM may settle an amber either way and soften a green by one step;
/// it can never upgrade a deterministic red, nor turn a deterministic green
/// red outright.
pub fn final_status(deterministic: Status, llm: Option<Status>) -> Status {
    match deterministic {
        Status::Red => Status::Red,
        Status::Amber => match llm {
            Some(Status::Green) => Status::Green,
            Some(Status::Red) => Status::Red,
            _ => Status::Amber,
        },
        Status::Green => match llm {
            Some(Status::Amber) | Some(Status::Red) => Status::Amber,
            _ => Status::Green,
        },
        Status::Unknown => llm.unwrap_or(Status::Unknown),
    }
}

fn squash(value: &str) -> String {
    NON_ALNUM.replace_all(&value.to_lowercase(), "").to_string()
}

/// A suggestion is grounded when it appears in its cited evidence verbatim,
/// modulo whitespace, or modulo punctuation.
pub fn suggestion_grounded(suggested_value: &str, evidence: &str) -> bool {
    if suggested_value.is_empty() || evidence.is_empty() {
        return false;
    }
    if evidence
        .to_lowercase()
        .contains(&suggested_value.to_lowercase())
    {
        return true;
    }
    let ev_compact: String = evidence
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let val_compact: String = suggested_value
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if !val_compact.is_empty() && ev_compact.contains(&val_compact) {
        return true;
    }
    let ev_alnum = squash(evidence);
    let val_alnum = squash(suggested_value);
    !val_alnum.is_empty() && ev_alnum.contains(&val_alnum)
}

/// Same value modulo case and punctuation.
pub fn trivial_normalization(a: &str, b: &str) -> bool {
    let a_norm = squash(a);
    !a_norm.is_empty() && a_norm == squash(b)
}
