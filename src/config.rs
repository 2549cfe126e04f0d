//! Layered application configuration: defaults, optional file, environment.

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use field_resolver::LlmScope;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AutofillConfig {
    pub form_url: String,
    pub headless: bool,
    pub keep_open: bool,
    pub nav_timeout_ms: u64,
    pub step_timeout_ms: u64,
}

impl Default for AutofillConfig {
    fn default() -> Self {
        Self {
            form_url: String::new(),
            headless: true,
            keep_open: false,
            nav_timeout_ms: 45_000,
            step_timeout_ms: 15_000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    pub enabled: bool,
    pub scope: LlmScope,
    pub target_tokens: usize,
    pub output_tokens_per_field: usize,
    /// Fixed batch size; zero derives it from the token budget.
    pub batch_size: usize,
    pub label_max_chars: usize,
    pub value_max_chars: usize,
    pub evidence_max_chars: usize,
    pub reason_max_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scope: LlmScope::Smart,
            target_tokens: 3500,
            output_tokens_per_field: 40,
            batch_size: 0,
            label_max_chars: 80,
            value_max_chars: 120,
            evidence_max_chars: 320,
            reason_max_chars: 160,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub autofill: AutofillConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

impl AppConfig {
    /// Defaults, then an optional TOML file, then `CANONFILL_*` env vars
    /// (`CANONFILL_AUTOFILL__FORM_URL=...`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix("CANONFILL")
                .separator("__")
                .try_parsing(true),
        );
        builder
            .build()
            .context("building configuration")?
            .try_deserialize()
            .context("deserializing configuration")
    }
}
