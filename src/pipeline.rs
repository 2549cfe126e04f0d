//! End-to-end orchestration: merge, resolve, autofill, re-resolve, report.

use autofill_executor::{run_autofill, AutofillOptions, BrowserPort};
use canonfill_core_types::{AutofillReport, RunId};
use canonfill_field_registry::{CanonicalRecord, FieldRegistry};
use coverage_report::{build_coverage_report, CoverageReport};
use field_resolver::{
    merge_identity_fields, resolve_fields, summarize_review, BatchPolicy, ContextLimits,
    ResolveOptions, ResolveReport, ReviewSummary, VerdictPort,
};
use tracing::{info, warn};

use crate::config::AppConfig;

/// Everything one pipeline run produced.
pub struct PipelineOutcome {
    pub record: CanonicalRecord,
    pub autofill: AutofillReport,
    pub validation: ResolveReport,
    pub summary: ReviewSummary,
    pub coverage: CoverageReport,
    /// Set when navigation failed; outcome sets are empty in that case.
    pub navigation_error: Option<String>,
}

fn resolve_options(config: &AppConfig) -> ResolveOptions {
    ResolveOptions {
        use_llm: config.llm.enabled,
        scope: config.llm.scope,
        limits: ContextLimits {
            label_max_chars: config.llm.label_max_chars,
            value_max_chars: config.llm.value_max_chars,
            evidence_max_chars: config.llm.evidence_max_chars,
            reason_max_chars: config.llm.reason_max_chars,
        },
        batch: BatchPolicy {
            target_tokens: config.llm.target_tokens,
            output_tokens_per_field: config.llm.output_tokens_per_field,
            batch_size: config.llm.batch_size,
        },
    }
}

/// Reconcile only: identity merge plus one resolver pass.
pub async fn reconcile(
    registry: &FieldRegistry,
    mut record: CanonicalRecord,
    verdict_port: Option<&dyn VerdictPort>,
    config: &AppConfig,
) -> (ResolveReport, ReviewSummary) {
    merge_identity_fields(&mut record);
    let report = resolve_fields(
        registry,
        &record,
        &AutofillReport::default(),
        verdict_port,
        &resolve_options(config),
    )
    .await;
    let summary = summarize_review(registry, &report.fields);
    (report, summary)
}

/// Full run. Autofill is attempted only when the conflict gate is open;
/// a navigation failure yields empty outcome sets and a recorded top-level
/// error rather than partial results.
pub async fn run_pipeline(
    run_id: RunId,
    registry: &FieldRegistry,
    record: CanonicalRecord,
    browser: &dyn BrowserPort,
    verdict_port: Option<&dyn VerdictPort>,
    config: &AppConfig,
) -> PipelineOutcome {
    let (pre, pre_summary) = reconcile(registry, record, verdict_port, config).await;
    let record = pre.record;

    let mut navigation_error = None;
    let autofill = if !pre_summary.ready_for_autofill {
        warn!(
            conflicts = pre_summary.conflicts,
            "unresolved conflicts; skipping autofill"
        );
        AutofillReport::default()
    } else {
        let options = AutofillOptions {
            form_url: config.autofill.form_url.clone(),
            keep_open: config.autofill.keep_open,
        };
        match run_autofill(registry, &record, browser, &options).await {
            Ok(report) => report,
            Err(err) if err.is_fatal() => {
                warn!(error = %err, "navigation failed; aborting with empty outcome sets");
                navigation_error = Some(err.to_string());
                AutofillReport::default()
            }
            Err(err) => {
                warn!(error = %err, "autofill run failed");
                navigation_error = Some(err.to_string());
                AutofillReport::default()
            }
        }
    };

    // DOM readback re-enters the resolver as fresh evidence.
    let validation = resolve_fields(
        registry,
        &record,
        &autofill,
        verdict_port,
        &resolve_options(config),
    )
    .await;
    let summary = summarize_review(registry, &validation.fields);
    let coverage = build_coverage_report(
        run_id,
        registry,
        &validation.record,
        &autofill,
        &validation.fields,
        &summary,
    );
    info!(
        filled = autofill.filled_fields.len(),
        conflicts = summary.conflicts,
        ready = summary.ready_for_autofill,
        "pipeline complete"
    );

    PipelineOutcome {
        record: validation.record.clone(),
        autofill,
        validation,
        summary,
        coverage,
        navigation_error,
    }
}
