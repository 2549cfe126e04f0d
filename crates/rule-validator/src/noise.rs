//! Label-noise and placeholder detection.
//!
//! OCR of a form frequently captures the prompt itself ("City or Town")
//! instead of an answer. A captured value that is a token subset of its own
//! label hints, a known prompt phrase, or a placeholder marker is noise,
//! not data.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

pub const PLACEHOLDER_VALUES: &[&str] = &[
    "n/a",
    "na",
    "none",
    "not applicable",
    "not available",
    "unknown",
    "nil",
    "-",
];

pub const LABEL_NOISE_PHRASES: &[&str] = &[
    "uscis online account number",
    "online account number",
    "account number",
    "receipt number",
    "alien registration number",
    "a-number",
    "if applicable",
    "if any",
    "ifapplicable",
    "ifany",
    "email address",
    "address if any",
    "street number and name",
    "street number",
    "number and name",
    "city or town",
    "zip code",
    "postal code",
    "usps zip code lookup",
    "family name",
    "given name",
    "middle name",
    "last name",
    "first name",
    "law firm name",
    "name of law firm",
    "organization name",
    "licensing authority",
    "bar number",
    "bar no",
    "daytime phone",
    "phone number",
    "mobile phone",
    "mobile number",
    "mobile telephone",
    "country",
    "state",
    "street",
    "address",
    "city",
    "town",
    "email",
    "phone",
    "telephone",
    "apt",
    "ste",
    "suite",
    "flr",
    "fir",
    "floor",
    "unit",
];

static LABEL_NOISE_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    LABEL_NOISE_PHRASES
        .iter()
        .flat_map(|phrase| phrase.split_whitespace())
        .collect()
});

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());
static ONLY_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^A-Za-z0-9]+$").unwrap());

fn normalize(text: &str) -> String {
    NON_ALNUM
        .replace_all(&text.to_lowercase(), " ")
        .trim()
        .to_string()
}

/// An explicit not-applicable marker, or a value OCR emptied out entirely.
pub fn is_placeholder_value(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    let normalized = normalize(value);
    if normalized.is_empty() {
        return true;
    }
    let collapsed = normalized.replace(' ', "");
    PLACEHOLDER_VALUES.contains(&normalized.as_str())
        || PLACEHOLDER_VALUES.contains(&collapsed.as_str())
}

fn tokens_subset(value_tokens: &[&str], hint_tokens: &[&str]) -> bool {
    if value_tokens.is_empty() {
        return false;
    }
    value_tokens
        .iter()
        .all(|token| hint_tokens.contains(token))
}

/// True when the captured value reads like the field's own prompt.
pub fn looks_like_label_value(value: &str, label_hints: &[String]) -> bool {
    let raw = value.trim();
    if raw.is_empty() {
        return true;
    }
    if is_placeholder_value(raw) {
        return true;
    }
    let normalized = normalize(raw);
    if normalized.is_empty() {
        return true;
    }

    if normalized.contains("if any") || normalized.contains("if applicable") {
        return true;
    }

    for phrase in LABEL_NOISE_PHRASES {
        if normalized.contains(phrase) {
            let phrase_len = phrase.split_whitespace().count();
            if normalized == *phrase {
                return true;
            }
            if phrase_len >= 2 && normalized.split_whitespace().count() <= 4 {
                return true;
            }
        }
    }

    for hint in label_hints {
        let hint_norm = normalize(hint);
        if hint_norm.is_empty() {
            continue;
        }
        if normalized == hint_norm {
            return true;
        }
        let hint_tokens: Vec<&str> = hint_norm.split_whitespace().collect();
        let value_tokens: Vec<&str> = normalized.split_whitespace().collect();
        if tokens_subset(&value_tokens, &hint_tokens)
            && value_tokens.len() <= hint_tokens.len() + 1
        {
            return true;
        }
    }

    if ONLY_PUNCT.is_match(raw) {
        return true;
    }

    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    if !tokens.is_empty()
        && tokens.len() <= 4
        && tokens.iter().all(|t| LABEL_NOISE_WORDS.contains(t))
    {
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_detected() {
        assert!(is_placeholder_value("N/A"));
        assert!(is_placeholder_value("not applicable"));
        assert!(is_placeholder_value("-"));
        assert!(!is_placeholder_value("42 Main St"));
        assert!(!is_placeholder_value(""));
    }

    #[test]
    fn prompt_text_is_label_noise() {
        assert!(looks_like_label_value("City or Town", &[]));
        assert!(looks_like_label_value("Email Address (if any)", &[]));
        assert!(looks_like_label_value("Family Name", &[]));
        assert!(!looks_like_label_value("Springfield", &[]));
    }

    #[test]
    fn hint_subset_is_label_noise() {
        let hints = vec!["Daytime Telephone Number".to_string()];
        assert!(looks_like_label_value("Daytime Telephone", &hints));
        assert!(!looks_like_label_value("555-010-2030", &hints));
    }

    #[test]
    fn punctuation_only_is_noise() {
        assert!(looks_like_label_value("###", &[]));
    }
}
