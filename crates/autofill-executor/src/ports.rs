//! The browser boundary.
//!
//! Reads are restricted to form traversal (inputs, selects, textareas and
//! their label/fieldset/legend text); writes to value-set, check, and
//! select. There is deliberately no click-arbitrary-element or submit
//! operation on this port.

use async_trait::async_trait;
use canonfill_core_types::{FormCandidate, OptionItem};

use crate::errors::AutofillError;
use crate::model::{ElementProbe, ScannedField};

#[async_trait]
pub trait BrowserPort: Send + Sync {
    /// Load the target form. The only fatal failure in a run.
    async fn navigate(&self, url: &str) -> Result<(), AutofillError>;

    /// Discover labelled fill targets from the live DOM.
    async fn collect_candidates(&self) -> Result<Vec<FormCandidate>, AutofillError>;

    /// Whole-form scan for the completeness report.
    async fn scan_form_fields(&self) -> Result<Vec<ScannedField>, AutofillError>;

    async fn exists(&self, locator: &str) -> Result<bool, AutofillError>;
    async fn probe(&self, locator: &str) -> Result<ElementProbe, AutofillError>;

    async fn fill_text(&self, locator: &str, value: &str) -> Result<(), AutofillError>;
    async fn read_value(&self, locator: &str) -> Result<Option<String>, AutofillError>;

    async fn select_options(&self, locator: &str) -> Result<Vec<OptionItem>, AutofillError>;
    async fn select_by_value(&self, locator: &str, value: &str) -> Result<(), AutofillError>;
    async fn select_by_label(&self, locator: &str, label: &str) -> Result<(), AutofillError>;
    async fn selected_option(&self, locator: &str) -> Result<Option<OptionItem>, AutofillError>;

    /// Options of the radio group the locator belongs to, as
    /// `(value, rendered label)` pairs.
    async fn radio_group(&self, locator: &str) -> Result<Vec<OptionItem>, AutofillError>;
    async fn radio_selected(&self, locator: &str) -> Result<Option<OptionItem>, AutofillError>;
    async fn check_radio_value(&self, locator: &str, value: &str) -> Result<(), AutofillError>;

    async fn set_checked(&self, locator: &str) -> Result<(), AutofillError>;
    async fn is_checked(&self, locator: &str) -> Result<bool, AutofillError>;

    async fn current_url(&self) -> Result<String, AutofillError>;
}
