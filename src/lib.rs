//! Canonfill: reconciled canonical records driven into a third-party web
//! form with per-field verification.
//!
//! The library surface re-exports the member crates and hosts the CLI's
//! configuration and pipeline orchestration.

pub mod config;
pub mod pipeline;

pub use autofill_executor as executor;
pub use autofill_matcher as matcher;
pub use canonfill_core_types as core_types;
pub use canonfill_field_registry as registry;
pub use coverage_report as coverage;
pub use field_resolver as resolver;
pub use rule_validator as rules;
