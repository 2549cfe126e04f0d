use std::path::PathBuf;

use anyhow::{Context, Result};
use canonfill_cli::config::AppConfig;
use canonfill_cli::pipeline::{reconcile, run_pipeline};
use canonfill_core_types::RunId;
use canonfill_field_registry::{CanonicalRecord, FieldRegistry};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser)]
#[command(
    name = "canonfill",
    version,
    long_version = LONG_VERSION,
    about = "Reconcile extracted document fields and drive them into a web form"
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct RecordArgs {
    /// Canonical record JSON (as produced by extraction).
    #[arg(long)]
    record: PathBuf,

    /// Where to write outputs; defaults to stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the field registry.
    Fields,
    /// Run the resolver over a record and report per-field status.
    Resolve(RecordArgs),
    /// Resolve, autofill the configured form, re-validate, and emit the
    /// coverage report.
    Run {
        #[command(flatten)]
        record: RecordArgs,

        /// Override the configured form URL.
        #[arg(long)]
        form_url: Option<String>,

        /// Run the browser with a visible window.
        #[arg(long)]
        headed: bool,

        /// Keep the browser open after the run for manual follow-up.
        #[arg(long)]
        keep_open: bool,
    },
}

fn load_record(path: &PathBuf) -> Result<CanonicalRecord> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading record {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing record {}", path.display()))
}

fn emit(out: Option<&PathBuf>, value: &serde_json::Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("writing {}", path.display()))?;
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    let registry = FieldRegistry::builtin().context("loading field registry")?;

    match cli.command {
        Command::Fields => {
            let fields: Vec<_> = registry.iter().collect();
            emit(None, &serde_json::to_value(fields)?)?;
        }
        Command::Resolve(args) => {
            let record = load_record(&args.record)?;
            let (report, summary) = reconcile(&registry, record, None, &config).await;
            let payload = serde_json::json!({
                "llm_used": report.llm_used,
                "llm_error": report.llm_error,
                "fields": report.fields,
                "summary": summary,
                "record": report.record,
            });
            emit(args.out.as_ref(), &payload)?;
        }
        Command::Run {
            record,
            form_url,
            headed,
            keep_open,
        } => {
            if let Some(url) = form_url {
                config.autofill.form_url = url;
            }
            if headed {
                config.autofill.headless = false;
            }
            if keep_open {
                config.autofill.keep_open = true;
                config.autofill.headless = false;
            }
            anyhow::ensure!(
                !config.autofill.form_url.is_empty(),
                "no form URL configured; pass --form-url or set autofill.form_url"
            );

            let canonical = load_record(&record.record)?;
            let browser = canonfill_cli::executor::CdpBrowser::launch(
                canonfill_cli::executor::CdpBrowserConfig {
                    headless: config.autofill.headless,
                    nav_timeout_ms: config.autofill.nav_timeout_ms,
                    step_timeout_ms: config.autofill.step_timeout_ms,
                },
            )
            .await
            .map_err(|e| anyhow::anyhow!("launching browser: {e}"))?;

            let run_id = RunId::new();
            let outcome = run_pipeline(
                run_id.clone(),
                &registry,
                canonical,
                &browser,
                None,
                &config,
            )
            .await;

            // Keep-open defers session release to the browser's own
            // lifecycle for manual human follow-up.
            if !config.autofill.keep_open {
                browser.close().await;
            }

            let payload = serde_json::json!({
                "run_id": run_id,
                "navigation_error": outcome.navigation_error,
                "autofill": outcome.autofill,
                "summary": outcome.summary,
                "coverage": outcome.coverage,
                "record": outcome.record,
            });
            emit(record.out.as_ref(), &payload)?;
        }
    }

    Ok(())
}
