//! End-to-end pipeline behavior: MRZ-seeded records, the conflict gate,
//! and run determinism, all against an in-memory browser.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use canonfill_cli::config::AppConfig;
use canonfill_cli::pipeline::{reconcile, run_pipeline};
use canonfill_core_types::{
    FieldCandidate, FillResult, FormCandidate, OptionItem, Presence, RunId, Source, Status,
};
use canonfill_field_registry::{CanonicalRecord, FieldRegistry};
use canonfill_cli::executor::errors::AutofillError;
use canonfill_cli::executor::model::{ElementProbe, ScannedField};
use canonfill_cli::executor::BrowserPort;
use field_resolver::{apply_candidate, MatchQuality};
use rule_validator::mrz::extract_mrz_from_text;

const MRZ_TEXT: &str = "REPUBLIC OF UTOPIA\nPASSPORT\n\
P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<\n\
L898902C36UTO7408122F1204159ZE184226B<<<<<10\n";

struct TextFormBrowser {
    candidates: Vec<FormCandidate>,
    values: Mutex<BTreeMap<String, String>>,
}

impl TextFormBrowser {
    fn new(labels: &[(&str, &str)]) -> Self {
        Self {
            candidates: labels
                .iter()
                .map(|(label, locator)| FormCandidate {
                    label_text: label.to_string(),
                    locator: locator.to_string(),
                })
                .collect(),
            values: Mutex::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl BrowserPort for TextFormBrowser {
    async fn navigate(&self, _url: &str) -> Result<(), AutofillError> {
        Ok(())
    }

    async fn collect_candidates(&self) -> Result<Vec<FormCandidate>, AutofillError> {
        Ok(self.candidates.clone())
    }

    async fn scan_form_fields(&self) -> Result<Vec<ScannedField>, AutofillError> {
        Ok(Vec::new())
    }

    async fn exists(&self, locator: &str) -> Result<bool, AutofillError> {
        Ok(self.candidates.iter().any(|c| c.locator == locator))
    }

    async fn probe(&self, _locator: &str) -> Result<ElementProbe, AutofillError> {
        Ok(ElementProbe {
            tag: "input".into(),
            input_type: Some("text".into()),
        })
    }

    async fn fill_text(&self, locator: &str, value: &str) -> Result<(), AutofillError> {
        self.values
            .lock()
            .unwrap()
            .insert(locator.to_string(), value.to_string());
        Ok(())
    }

    async fn read_value(&self, locator: &str) -> Result<Option<String>, AutofillError> {
        Ok(self.values.lock().unwrap().get(locator).cloned())
    }

    async fn select_options(&self, _locator: &str) -> Result<Vec<OptionItem>, AutofillError> {
        Ok(Vec::new())
    }

    async fn select_by_value(&self, _locator: &str, _value: &str) -> Result<(), AutofillError> {
        Err(AutofillError::Element("not a select".into()))
    }

    async fn select_by_label(&self, _locator: &str, _label: &str) -> Result<(), AutofillError> {
        Err(AutofillError::Element("not a select".into()))
    }

    async fn selected_option(&self, _locator: &str) -> Result<Option<OptionItem>, AutofillError> {
        Ok(None)
    }

    async fn radio_group(&self, _locator: &str) -> Result<Vec<OptionItem>, AutofillError> {
        Ok(Vec::new())
    }

    async fn radio_selected(&self, _locator: &str) -> Result<Option<OptionItem>, AutofillError> {
        Ok(None)
    }

    async fn check_radio_value(&self, _locator: &str, _value: &str) -> Result<(), AutofillError> {
        Err(AutofillError::Element("not a radio".into()))
    }

    async fn set_checked(&self, _locator: &str) -> Result<(), AutofillError> {
        Err(AutofillError::Element("not a checkbox".into()))
    }

    async fn is_checked(&self, _locator: &str) -> Result<bool, AutofillError> {
        Ok(false)
    }

    async fn current_url(&self) -> Result<String, AutofillError> {
        Ok("stub://form".into())
    }
}

fn seed_from_mrz(record: &mut CanonicalRecord) {
    let mrz = extract_mrz_from_text(MRZ_TEXT).expect("specimen MRZ parses");
    assert!(mrz.checks.all_valid());
    let evidence = MRZ_TEXT.to_string();
    for (path, value) in [
        ("passport.surname", mrz.surname.clone()),
        ("passport.given_names", mrz.given_names.clone()),
        ("passport.passport_number", mrz.passport_number.clone()),
        ("passport.date_of_birth", mrz.date_of_birth.clone()),
        ("passport.date_of_expiration", mrz.date_of_expiration.clone()),
        ("passport.sex", mrz.sex.clone()),
    ] {
        if let Some(value) = value {
            apply_candidate(
                record,
                &FieldCandidate {
                    path: path.into(),
                    value,
                    source: Source::Mrz,
                    evidence: Some(evidence.clone()),
                    confidence: None,
                    presence: Presence::Present,
                },
                MatchQuality::Exact,
            );
        }
    }
}

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.autofill.form_url = "stub://form".into();
    config
}

#[tokio::test]
async fn mrz_specimen_reconciles_to_expected_canonical_values() {
    let registry = FieldRegistry::builtin().unwrap();
    let mut record = CanonicalRecord::default();
    seed_from_mrz(&mut record);

    let (report, summary) = reconcile(&registry, record, None, &config()).await;
    let record = &report.record;
    assert_eq!(record.value("passport.surname").as_deref(), Some("Eriksson"));
    assert_eq!(
        record.value("passport.given_names").as_deref(),
        Some("Anna Maria")
    );
    assert_eq!(
        record.value("passport.passport_number").as_deref(),
        Some("L898902C3")
    );
    assert_eq!(
        record.value("passport.date_of_birth").as_deref(),
        Some("1974-08-12")
    );
    assert_eq!(record.value("passport.sex").as_deref(), Some("F"));
    // Identity merge propagated the passport names onto the client block.
    assert_eq!(
        record.value("representation.client.family_name").as_deref(),
        Some("Eriksson")
    );
    assert!(summary.ready_for_autofill);

    let surname = &report.fields["passport.surname"];
    assert_eq!(surname.status, Status::Green);
    // The expired specimen document fails the future-date rule.
    let expiry = &report.fields["passport.date_of_expiration"];
    assert_eq!(expiry.status, Status::Red);
}

#[tokio::test]
async fn conflicts_close_the_gate_and_skip_autofill() {
    let registry = FieldRegistry::builtin().unwrap();
    let mut record = CanonicalRecord::default();
    seed_from_mrz(&mut record);
    apply_candidate(
        &mut record,
        &FieldCandidate {
            path: "representation.client.family_name".into(),
            value: "Erikson".into(),
            source: Source::Ocr,
            evidence: Some("Family Name: Erikson".into()),
            confidence: None,
            presence: Presence::Present,
        },
        MatchQuality::Exact,
    );

    let browser = TextFormBrowser::new(&[("Family Name", "#family-name")]);
    let outcome = run_pipeline(
        RunId::new(),
        &registry,
        record,
        &browser,
        None,
        &config(),
    )
    .await;

    assert!(!outcome.summary.ready_for_autofill);
    assert!(outcome.summary.conflicts > 0);
    assert!(outcome.autofill.attempted_fields.is_empty());
    assert!(outcome.autofill.filled_fields.is_empty());
    assert!(!outcome.coverage.ready_for_autofill);
    // The conflicted field is never green.
    let entry = &outcome.validation.fields["representation.client.family_name"];
    assert_ne!(entry.status, Status::Green);
}

#[tokio::test]
async fn clean_record_fills_and_reports_coverage() {
    let registry = FieldRegistry::builtin().unwrap();
    let mut record = CanonicalRecord::default();
    seed_from_mrz(&mut record);

    let browser = TextFormBrowser::new(&[
        ("Family Name", "#family-name"),
        ("Given Name", "#given-name"),
        ("Passport Number", "#passport-number"),
    ]);
    let outcome = run_pipeline(
        RunId::new(),
        &registry,
        record,
        &browser,
        None,
        &config(),
    )
    .await;

    assert!(outcome.navigation_error.is_none());
    assert!(outcome
        .autofill
        .filled_fields
        .contains(&"passport.passport_number".to_string()));
    let row = outcome
        .coverage
        .fields
        .iter()
        .find(|r| r.field == "passport.passport_number")
        .unwrap();
    assert_eq!(row.autofill_result, FillResult::Pass);
    assert_eq!(row.dom_readback_value.as_deref(), Some("L898902C3"));
    assert!(row.autofill_selector_used.is_some());
}

#[tokio::test]
async fn repeated_runs_are_identical() {
    let registry = FieldRegistry::builtin().unwrap();
    let mut record = CanonicalRecord::default();
    seed_from_mrz(&mut record);
    let browser = TextFormBrowser::new(&[
        ("Family Name", "#family-name"),
        ("Given Name", "#given-name"),
        ("Passport Number", "#passport-number"),
    ]);

    let first = run_pipeline(
        RunId::new(),
        &registry,
        record.clone(),
        &browser,
        None,
        &config(),
    )
    .await;
    let second = run_pipeline(
        RunId::new(),
        &registry,
        record,
        &browser,
        None,
        &config(),
    )
    .await;

    assert_eq!(
        first.autofill.attempted_fields,
        second.autofill.attempted_fields
    );
    assert_eq!(first.autofill.filled_fields, second.autofill.filled_fields);
    assert_eq!(first.autofill.fill_failures, second.autofill.fill_failures);
}
