//! Value-matching strategies for selects, radios, checkboxes, and the
//! compound unit field.

use canonfill_core_types::{FailureReason, OptionItem};
use once_cell::sync::Lazy;
use regex::Regex;

use autofill_matcher::normalized_similarity;

/// Fuzzy label threshold for the last rung of the select ladder.
pub const SELECT_FUZZY_THRESHOLD: f64 = 0.82;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());
static UNIT_APT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(apt|apartment)\b").unwrap());
static UNIT_STE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(ste|suite)\b").unwrap());
static UNIT_FLR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(flr|floor)\b").unwrap());
static UNIT_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(apt|apartment|ste|suite|flr|floor|unit)\b").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn normalize_key(value: &str) -> String {
    NON_ALNUM
        .replace_all(&value.to_lowercase(), "")
        .trim()
        .to_string()
}

/// Checkbox truthiness: an explicit falsy marker means "leave unchecked",
/// any other non-empty value means "check".
pub fn should_check_checkbox(value: &str) -> bool {
    let text = value.trim().to_lowercase();
    if text.is_empty() {
        return false;
    }
    !matches!(text.as_str(), "false" | "no" | "0" | "off" | "n")
}

/// ≤3-char initialism of a label ("New York" → "NY").
pub fn initialism(label: &str) -> String {
    label
        .split(|c: char| !c.is_alphabetic())
        .filter_map(|part| part.chars().next())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// How a select option was matched, in ladder priority order.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectMatch {
    Value(String),
    Label(String),
    Initialism(String),
    Fuzzy { label: String, score: f64 },
}

impl SelectMatch {
    /// The option label (or value) to select by.
    pub fn target(&self) -> (&'static str, &str) {
        match self {
            SelectMatch::Value(value) => ("value", value),
            SelectMatch::Label(label)
            | SelectMatch::Initialism(label)
            | SelectMatch::Fuzzy { label, .. } => ("label", label),
        }
    }
}

/// Select ladder: exact value, exact label, short initialism, fuzzy label.
/// First rung that matches wins.
pub fn match_select_option(
    value: &str,
    options: &[OptionItem],
) -> Result<SelectMatch, FailureReason> {
    if options.is_empty() {
        return Err(FailureReason::NoSelectOptions);
    }
    let raw = value.trim();
    if raw.is_empty() {
        return Err(FailureReason::EmptyValue);
    }
    let lowered = raw.to_lowercase();

    if let Some(opt) = options
        .iter()
        .find(|o| o.value.trim().to_lowercase() == lowered)
    {
        return Ok(SelectMatch::Value(opt.value.clone()));
    }
    if let Some(opt) = options
        .iter()
        .find(|o| o.label.trim().to_lowercase() == lowered)
    {
        return Ok(SelectMatch::Label(opt.label.clone()));
    }
    if raw.len() <= 3 {
        let upper = raw.to_uppercase();
        if let Some(opt) = options.iter().find(|o| initialism(&o.label) == upper) {
            return Ok(SelectMatch::Initialism(opt.label.clone()));
        }
    }
    let mut best: Option<(f64, &OptionItem)> = None;
    for opt in options {
        let score = normalized_similarity(raw, &opt.label);
        if best.map(|(s, _)| score > s).unwrap_or(true) {
            best = Some((score, opt));
        }
    }
    if let Some((score, opt)) = best {
        if score >= SELECT_FUZZY_THRESHOLD && !opt.label.is_empty() {
            return Ok(SelectMatch::Fuzzy {
                label: opt.label.clone(),
                score,
            });
        }
    }
    Err(FailureReason::NoSelectMatch)
}

/// Radio matching: exact normalized value/label equality, then a
/// short-target-prefix-of-label rule for one/two-character targets
/// (sex "F" against "Female").
pub fn match_radio_option<'a>(
    value: &str,
    options: &'a [OptionItem],
) -> Result<&'a OptionItem, FailureReason> {
    let target = normalize_key(value);
    if target.is_empty() {
        return Err(FailureReason::NoRadioMatch);
    }
    for opt in options {
        let value_key = normalize_key(&opt.value);
        let label_key = normalize_key(&opt.label);
        if value_key == target || label_key == target {
            return Ok(opt);
        }
    }
    if target.len() <= 2 {
        for opt in options {
            if normalize_key(&opt.label).starts_with(&target) {
                return Ok(opt);
            }
        }
    }
    Err(FailureReason::NoRadioMatch)
}

/// Unit designator parsed from a compound value like "Apt 4B".
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnitKind {
    Apt,
    Ste,
    Flr,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Apt => "apt",
            UnitKind::Ste => "ste",
            UnitKind::Flr => "flr",
        }
    }
}

/// Split a unit value into designator and number. "Suite 210" → (Ste, 210).
pub fn parse_unit_value(value: &str) -> (Option<UnitKind>, Option<String>) {
    let raw = value.trim();
    if raw.is_empty() {
        return (None, None);
    }
    let kind = if UNIT_APT.is_match(raw) {
        Some(UnitKind::Apt)
    } else if UNIT_STE.is_match(raw) {
        Some(UnitKind::Ste)
    } else if UNIT_FLR.is_match(raw) {
        Some(UnitKind::Flr)
    } else {
        None
    };
    let number = UNIT_WORDS.replace_all(raw, " ");
    let number = number.replace('#', " ");
    let number = WHITESPACE.replace_all(&number, " ").trim().to_string();
    let number = if number.is_empty() { None } else { Some(number) };
    (kind, number)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<OptionItem> {
        vec![
            OptionItem {
                value: "IL".into(),
                label: "Illinois".into(),
            },
            OptionItem {
                value: "NY".into(),
                label: "New York".into(),
            },
            OptionItem {
                value: "".into(),
                label: "Select a state".into(),
            },
        ]
    }

    #[test]
    fn select_ladder_priority() {
        assert_eq!(
            match_select_option("IL", &options()).unwrap(),
            SelectMatch::Value("IL".into())
        );
        assert_eq!(
            match_select_option("Illinois", &options()).unwrap(),
            SelectMatch::Label("Illinois".into())
        );
        // Initialism rung: "NY" hits the value rung first, so use a label
        // whose initialism differs from any value.
        let opts = vec![OptionItem {
            value: "x-1".into(),
            label: "New York".into(),
        }];
        assert_eq!(
            match_select_option("NY", &opts).unwrap(),
            SelectMatch::Initialism("New York".into())
        );
    }

    #[test]
    fn select_fuzzy_is_last_resort() {
        let matched = match_select_option("Ilinois", &options()).unwrap();
        match matched {
            SelectMatch::Fuzzy { label, score } => {
                assert_eq!(label, "Illinois");
                assert!(score >= SELECT_FUZZY_THRESHOLD);
            }
            other => panic!("expected fuzzy match, got {other:?}"),
        }
        assert_eq!(
            match_select_option("Wyoming", &options()),
            Err(FailureReason::NoSelectMatch)
        );
    }

    #[test]
    fn select_empty_cases() {
        assert_eq!(
            match_select_option("IL", &[]),
            Err(FailureReason::NoSelectOptions)
        );
        assert_eq!(
            match_select_option("   ", &options()),
            Err(FailureReason::EmptyValue)
        );
    }

    #[test]
    fn radio_exact_then_prefix() {
        let group = vec![
            OptionItem {
                value: "f".into(),
                label: "Female".into(),
            },
            OptionItem {
                value: "m".into(),
                label: "Male".into(),
            },
        ];
        assert_eq!(match_radio_option("F", &group).unwrap().value, "f");
        assert_eq!(match_radio_option("Male", &group).unwrap().value, "m");
        // Short-target prefix rule.
        let labels_only = vec![
            OptionItem {
                value: "1".into(),
                label: "Female".into(),
            },
            OptionItem {
                value: "2".into(),
                label: "Male".into(),
            },
        ];
        assert_eq!(match_radio_option("Fe", &labels_only).unwrap().value, "1");
        assert!(match_radio_option("X", &group).is_err());
    }

    #[test]
    fn checkbox_vocabulary() {
        for falsy in ["false", "No", "0", "off", "n", "  "] {
            assert!(!should_check_checkbox(falsy), "{falsy:?} should be falsy");
        }
        for truthy in ["true", "yes", "1", "checked", "anything"] {
            assert!(should_check_checkbox(truthy), "{truthy:?} should check");
        }
    }

    #[test]
    fn unit_values_parse() {
        assert_eq!(parse_unit_value("Apt 4B"), (Some(UnitKind::Apt), Some("4B".into())));
        assert_eq!(
            parse_unit_value("Suite 210"),
            (Some(UnitKind::Ste), Some("210".into()))
        );
        assert_eq!(parse_unit_value("Floor 3"), (Some(UnitKind::Flr), Some("3".into())));
        assert_eq!(parse_unit_value("#12"), (None, Some("12".into())));
        assert_eq!(parse_unit_value(""), (None, None));
    }
}
