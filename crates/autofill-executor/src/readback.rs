//! Post-write DOM readback and normalized comparison.

use canonfill_core_types::OptionItem;
use once_cell::sync::Lazy;
use regex::Regex;

use rule_validator::normalize::normalize_date;

use crate::errors::AutofillError;
use crate::model::{ElementKind, ReadbackDetails};
use crate::ports::BrowserPort;
use crate::strategies::should_check_checkbox;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn normalize_compare(value: &str) -> String {
    WHITESPACE
        .replace_all(value.trim(), "")
        .to_lowercase()
}

/// Shape a value for a given input type before writing or comparing.
/// Date inputs want ISO; everything else passes through trimmed.
pub fn normalize_for_input(value: &str, input_type: &str) -> Option<String> {
    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }
    if input_type == "date" {
        return Some(normalize_date(raw, true).unwrap_or_else(|| raw.to_string()));
    }
    Some(raw.to_string())
}

/// Type-aware readback: selected option for selects and radios, checked
/// state for checkboxes, raw value (date-normalized) for text.
pub async fn read_back(
    port: &dyn BrowserPort,
    locator: &str,
    kind: &ElementKind,
) -> Result<(Option<String>, ReadbackDetails), AutofillError> {
    let mut details = ReadbackDetails {
        input_type: Some(kind.input_type_label().to_string()),
        ..Default::default()
    };
    match kind {
        ElementKind::Select => {
            let selected = port.selected_option(locator).await.ok().flatten();
            details.selected_option = selected.clone();
            Ok((option_display(selected), details))
        }
        ElementKind::Radio => {
            let selected = port.radio_selected(locator).await.ok().flatten();
            details.selected_option = selected.clone();
            Ok((option_display(selected), details))
        }
        ElementKind::Checkbox => {
            let checked = port.is_checked(locator).await.unwrap_or(false);
            details.checked = Some(checked);
            Ok((checked.then(|| "checked".to_string()), details))
        }
        ElementKind::Text { input_type } => {
            let raw = port.read_value(locator).await.ok().flatten();
            let normalized = raw
                .as_deref()
                .and_then(|v| normalize_for_input(v, input_type));
            Ok((normalized.or(raw), details))
        }
        ElementKind::TextArea => Ok((port.read_value(locator).await.ok().flatten(), details)),
        ElementKind::Action | ElementKind::Unsupported => Ok((None, details)),
    }
}

fn option_display(option: Option<OptionItem>) -> Option<String> {
    option.and_then(|o| {
        if !o.value.is_empty() {
            Some(o.value)
        } else if !o.label.is_empty() {
            Some(o.label)
        } else {
            None
        }
    })
}

/// Assert the DOM now holds what we wrote, after normalization.
pub fn matches_expected(
    expected: &str,
    readback_value: Option<&str>,
    details: &ReadbackDetails,
) -> bool {
    let input_type = details.input_type.as_deref().unwrap_or("");
    if input_type == "checkbox" {
        return should_check_checkbox(expected) == details.checked.unwrap_or(false);
    }
    let Some(readback_value) = readback_value.filter(|v| !v.trim().is_empty()) else {
        return false;
    };
    if expected.trim().is_empty() {
        return false;
    }
    let expected_norm = normalize_compare(
        &normalize_for_input(expected, input_type).unwrap_or_else(|| expected.to_string()),
    );
    if matches!(input_type, "select" | "radio") {
        let mut candidates = vec![readback_value.to_string()];
        if let Some(selected) = &details.selected_option {
            candidates.push(selected.value.clone());
            candidates.push(selected.label.clone());
        }
        return candidates
            .iter()
            .any(|candidate| normalize_compare(candidate) == expected_norm);
    }
    let actual_norm = normalize_compare(
        &normalize_for_input(readback_value, input_type)
            .unwrap_or_else(|| readback_value.to_string()),
    );
    expected_norm == actual_norm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_comparison_ignores_case_and_spacing() {
        let details = ReadbackDetails {
            input_type: Some("text".into()),
            ..Default::default()
        };
        assert!(matches_expected("Anna Maria", Some("anna maria"), &details));
        assert!(!matches_expected("Anna Maria", Some("Anna"), &details));
        assert!(!matches_expected("Anna", None, &details));
    }

    #[test]
    fn date_comparison_normalizes_both_sides() {
        let details = ReadbackDetails {
            input_type: Some("date".into()),
            ..Default::default()
        };
        assert!(matches_expected("Aug 12, 1974", Some("1974-08-12"), &details));
    }

    #[test]
    fn select_comparison_accepts_value_or_label() {
        let details = ReadbackDetails {
            input_type: Some("select".into()),
            selected_option: Some(OptionItem {
                value: "IL".into(),
                label: "Illinois".into(),
            }),
            checked: None,
        };
        assert!(matches_expected("Illinois", Some("IL"), &details));
        assert!(matches_expected("IL", Some("IL"), &details));
        assert!(!matches_expected("Ohio", Some("IL"), &details));
    }

    #[test]
    fn checkbox_comparison_uses_truthiness() {
        let checked = ReadbackDetails {
            input_type: Some("checkbox".into()),
            checked: Some(true),
            ..Default::default()
        };
        assert!(matches_expected("yes", Some("checked"), &checked));
        assert!(!matches_expected("no", Some("checked"), &checked));
    }
}
