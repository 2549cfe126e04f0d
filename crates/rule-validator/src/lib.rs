//! Stateless validation rules for canonical fields.
//!
//! Everything here is a pure function over strings: label-noise and
//! placeholder detection, per-type format checks with normalization, and
//! TD3 MRZ parsing with check digits. No external services are ever called.

pub mod mrz;
pub mod noise;
pub mod normalize;
pub mod rules;

pub use mrz::{extract_mrz_lines, parse_mrz_td3, MrzChecks, MrzResult};
pub use noise::{is_placeholder_value, looks_like_label_value};
pub use rules::{validate_field, RuleContext, RuleOutcome};
