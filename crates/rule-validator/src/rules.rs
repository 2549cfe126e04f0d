//! Per-type deterministic validation with normalization suggestions.

use canonfill_core_types::FieldType;
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::noise::{is_placeholder_value, looks_like_label_value};
use crate::normalize::{
    normalize_country, normalize_date, normalize_email, normalize_name, normalize_passport_number,
    normalize_phone, normalize_sex,
};

pub static RE_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").unwrap());
pub static RE_PASSPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9]{7,9}$").unwrap());
pub static RE_ZIP_US: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{5}(-\d{4})?$").unwrap());
static RE_POSTAL_GENERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9 -]{3,10}$").unwrap());
static RE_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d").unwrap());
static RE_ONLY_SYMBOLS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^A-Za-z0-9]+$").unwrap());
static RE_ALPHA_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]{2,}").unwrap());
static RE_UNIT_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(apt|ste|suite|flr|floor|unit|#)\b").unwrap());

const US_STATES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY",
];

const HEADER_TOKENS: &[&str] = &[
    "notice of entry of appearance",
    "department of homeland security",
    "u.s. citizenship and immigration services",
    "uscis",
    "dhs",
    "attorney or accredited representative",
];

const US_COUNTRY_NAMES: &[&str] = &["united states", "usa", "us"];

pub fn is_us_country(value: &str) -> bool {
    US_COUNTRY_NAMES.contains(&value.trim().to_lowercase().as_str())
}

/// Outcome of one rule evaluation.
#[derive(Clone, Debug, Default)]
pub struct RuleOutcome {
    pub is_valid: bool,
    pub reasons: Vec<&'static str>,
    pub normalized: Option<String>,
    pub confidence_delta: f64,
}

impl RuleOutcome {
    fn new(
        is_valid: bool,
        reason: &'static str,
        normalized: Option<String>,
        confidence_delta: f64,
    ) -> Self {
        Self {
            is_valid,
            reasons: vec![reason],
            normalized,
            confidence_delta,
        }
    }

    fn invalid(reason: &'static str, delta: f64) -> Self {
        Self::new(false, reason, None, delta)
    }

    fn ok(reason: &'static str) -> Self {
        Self::new(true, reason, None, 0.0)
    }

    pub fn has_label_noise(&self) -> bool {
        self.reasons.iter().any(|r| {
            matches!(
                *r,
                "label_noise" | "email_label" | "phone_label" | "address_label"
            )
        })
    }

    /// Codes that pass validation but still warrant an amber status.
    pub fn has_benign_amber(&self) -> bool {
        self.reasons.iter().any(|r| {
            matches!(
                *r,
                "state_non_standard" | "postal_ok" | "unit_placeholder" | "account_number_unverified"
            )
        })
    }
}

/// Cross-field context available to individual rules.
#[derive(Clone, Debug, Default)]
pub struct RuleContext {
    pub country: Option<String>,
    pub allow_placeholder: bool,
}

fn looks_like_label_or_header(value: &str, label_hints: &[String]) -> bool {
    if looks_like_label_value(value, label_hints) {
        return true;
    }
    let lowered = value.to_lowercase();
    HEADER_TOKENS.iter().any(|token| lowered.contains(token))
}

fn alpha_ratio(value: &str) -> f64 {
    let letters = value.chars().filter(|c| c.is_alphabetic()).count();
    let total = value.chars().filter(|c| c.is_alphanumeric()).count();
    if total == 0 {
        return 0.0;
    }
    letters as f64 / total as f64
}

pub fn validate_name(value: &str, label_hints: &[String]) -> RuleOutcome {
    if looks_like_label_or_header(value, label_hints) {
        return RuleOutcome::invalid("label_noise", -0.3);
    }
    if RE_ONLY_SYMBOLS.is_match(value) {
        return RuleOutcome::invalid("name_length", -0.3);
    }
    if RE_DIGIT.is_match(value) {
        return RuleOutcome::invalid("name_numeric", -0.2);
    }
    if value.trim().len() < 2 {
        return RuleOutcome::invalid("name_length", -0.2);
    }
    if value.split_whitespace().count() > 6 {
        return RuleOutcome::invalid("name_word_count", -0.1);
    }
    if alpha_ratio(value) < 0.5 {
        return RuleOutcome::invalid("name_format", -0.2);
    }
    match normalize_name(value) {
        Some(normalized) if normalized != value => {
            RuleOutcome::new(true, "name_normalize", Some(normalized), 0.05)
        }
        _ => RuleOutcome::ok("name_ok"),
    }
}

pub fn validate_email(value: &str, label_hints: &[String]) -> RuleOutcome {
    if looks_like_label_or_header(value, label_hints) {
        return RuleOutcome::invalid("email_label", -0.3);
    }
    let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if let Some(normalized) = normalize_email(&cleaned) {
        if RE_EMAIL.is_match(&normalized) {
            if normalized != value {
                return RuleOutcome::new(true, "email_normalize", Some(normalized), 0.05);
            }
            return RuleOutcome::ok("email_ok");
        }
    }
    RuleOutcome::invalid("email_format", -0.2)
}

pub fn validate_phone(value: &str, label_hints: &[String]) -> RuleOutcome {
    if looks_like_label_or_header(value, label_hints) {
        return RuleOutcome::invalid("phone_label", -0.3);
    }
    let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
    let normalized = normalize_phone(value).filter(|n| n.as_str() != value);
    if !(7..=15).contains(&digits) {
        return RuleOutcome {
            is_valid: false,
            reasons: vec!["phone_format"],
            normalized,
            confidence_delta: -0.2,
        };
    }
    match normalized {
        Some(normalized) => RuleOutcome::new(true, "phone_normalize", Some(normalized), 0.05),
        None => RuleOutcome::ok("phone_ok"),
    }
}

pub fn validate_passport_number(value: &str) -> RuleOutcome {
    match normalize_passport_number(value) {
        Some(normalized) if RE_PASSPORT.is_match(&normalized) => {
            if normalized != value {
                RuleOutcome::new(true, "passport_normalize", Some(normalized), 0.05)
            } else {
                RuleOutcome::ok("passport_ok")
            }
        }
        normalized => RuleOutcome {
            is_valid: false,
            reasons: vec!["passport_format"],
            normalized,
            confidence_delta: -0.2,
        },
    }
}

pub fn validate_sex(value: &str) -> RuleOutcome {
    match normalize_sex(value) {
        None => RuleOutcome::invalid("sex_value", -0.2),
        Some(normalized) if normalized != value => {
            RuleOutcome::new(true, "sex_normalize", Some(normalized), 0.05)
        }
        Some(_) => RuleOutcome::ok("sex_ok"),
    }
}

pub fn validate_state(value: &str) -> RuleOutcome {
    let raw = value.trim().to_uppercase();
    if RE_DIGIT.is_match(&raw) || raw.len() < 2 {
        return RuleOutcome::invalid("state_format", -0.2);
    }
    if raw.len() == 2 {
        let normalized = if raw != value { Some(raw) } else { None };
        return RuleOutcome {
            is_valid: true,
            reasons: vec!["state_ok"],
            normalized,
            confidence_delta: 0.0,
        };
    }
    if raw.len() <= 30 && raw.chars().all(|c| c.is_alphabetic() || c == ' ') {
        return RuleOutcome {
            is_valid: true,
            reasons: vec!["state_non_standard"],
            normalized: normalize_name(value),
            confidence_delta: -0.1,
        };
    }
    RuleOutcome::invalid("state_format", -0.2)
}

pub fn validate_zip(value: &str, country: Option<&str>) -> RuleOutcome {
    let raw = value.trim();
    if RE_ZIP_US.is_match(raw) {
        return RuleOutcome::ok("zip_ok");
    }
    if let Some(country) = country {
        if !country.trim().is_empty() && !is_us_country(country) && RE_POSTAL_GENERIC.is_match(raw)
        {
            return RuleOutcome::new(true, "postal_ok", None, -0.1);
        }
    }
    RuleOutcome::invalid("zip_format", -0.2)
}

pub fn validate_date(value: &str, field_type: FieldType) -> RuleOutcome {
    let mut normalized = None;
    let mut parsed = chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").ok();
    if parsed.is_none() {
        normalized = normalize_date(value, true);
        parsed = normalized
            .as_deref()
            .and_then(|n| chrono::NaiveDate::parse_from_str(n, "%Y-%m-%d").ok());
    }
    let Some(date) = parsed else {
        return RuleOutcome {
            is_valid: false,
            reasons: vec!["date_format"],
            normalized,
            confidence_delta: -0.2,
        };
    };
    let today = Local::now().date_naive();
    if field_type == FieldType::DatePast && date > today {
        return RuleOutcome {
            is_valid: false,
            reasons: vec!["date_future"],
            normalized: Some(normalized.unwrap_or_else(|| value.to_string())),
            confidence_delta: -0.2,
        };
    }
    if field_type == FieldType::DateFuture && date < today {
        return RuleOutcome {
            is_valid: false,
            reasons: vec!["date_past"],
            normalized: Some(normalized.unwrap_or_else(|| value.to_string())),
            confidence_delta: -0.2,
        };
    }
    match normalized {
        Some(normalized) if normalized != value => {
            RuleOutcome::new(true, "date_normalize", Some(normalized), 0.05)
        }
        _ => RuleOutcome::ok("date_ok"),
    }
}

pub fn validate_address_street(value: &str, label_hints: &[String]) -> RuleOutcome {
    if looks_like_label_or_header(value, label_hints) {
        return RuleOutcome::invalid("address_label", -0.3);
    }
    if !RE_DIGIT.is_match(value) || !RE_ALPHA_RUN.is_match(value) {
        return RuleOutcome::invalid("address_street_format", -0.2);
    }
    RuleOutcome::ok("address_street_ok")
}

pub fn validate_address_unit(
    value: &str,
    label_hints: &[String],
    allow_placeholder: bool,
) -> RuleOutcome {
    if allow_placeholder && is_placeholder_value(value) {
        return RuleOutcome::new(true, "unit_placeholder", Some(value.trim().to_string()), -0.05);
    }
    if looks_like_label_or_header(value, label_hints) {
        return RuleOutcome::invalid("address_label", -0.3);
    }
    if RE_UNIT_MARKER.is_match(value) || RE_DIGIT.is_match(value) {
        return RuleOutcome::ok("address_unit_ok");
    }
    RuleOutcome::invalid("address_unit_format", -0.1)
}

pub fn validate_address_city(value: &str, label_hints: &[String]) -> RuleOutcome {
    if looks_like_label_or_header(value, label_hints) {
        return RuleOutcome::invalid("address_label", -0.3);
    }
    if RE_DIGIT.is_match(value) || !RE_ALPHA_RUN.is_match(value) {
        return RuleOutcome::invalid("address_city_format", -0.2);
    }
    RuleOutcome::ok("address_city_ok")
}

pub fn validate_address_country(value: &str, label_hints: &[String]) -> RuleOutcome {
    if looks_like_label_or_header(value, label_hints) {
        return RuleOutcome::invalid("address_label", -0.3);
    }
    if RE_DIGIT.is_match(value) || !RE_ALPHA_RUN.is_match(value) {
        return RuleOutcome::invalid("address_country_format", -0.2);
    }
    match normalize_country(value) {
        Some(normalized) if normalized != value => {
            RuleOutcome::new(true, "country_normalize", Some(normalized), 0.05)
        }
        _ => RuleOutcome::ok("address_country_ok"),
    }
}

pub fn validate_online_account_number(value: &str, label_hints: &[String]) -> RuleOutcome {
    if looks_like_label_or_header(value, label_hints) {
        return RuleOutcome::invalid("label_noise", -0.3);
    }
    let raw = value.trim();
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return RuleOutcome::invalid("account_number_missing_digits", -0.2);
    }
    if raw.chars().any(|c| c.is_alphabetic()) {
        return RuleOutcome::new(true, "account_number_unverified", None, -0.1);
    }
    if !(8..=15).contains(&digits.len()) {
        return RuleOutcome::new(true, "account_number_unverified", None, -0.1);
    }
    if digits != raw {
        return RuleOutcome::new(true, "account_number_normalize", Some(digits), 0.02);
    }
    RuleOutcome::ok("account_number_ok")
}

/// Dispatch on path suffix first (address parts, account numbers), then on
/// declared type. An empty value is its own signal, distinct from a format
/// failure.
pub fn validate_field(
    path: &str,
    field_type: FieldType,
    value: &str,
    label_hints: &[String],
    context: &RuleContext,
) -> RuleOutcome {
    let value = value.trim();
    if value.is_empty() {
        return RuleOutcome::invalid("empty", -0.2);
    }
    if path.ends_with("address.street") {
        return validate_address_street(value, label_hints);
    }
    if path.ends_with("address.unit") {
        return validate_address_unit(value, label_hints, context.allow_placeholder);
    }
    if path.ends_with("address.city") {
        return validate_address_city(value, label_hints);
    }
    if path.ends_with("address.state") {
        return validate_state(value);
    }
    if path.ends_with("address.zip") {
        return validate_zip(value, context.country.as_deref());
    }
    if path.ends_with("address.country") {
        return validate_address_country(value, label_hints);
    }
    if path.ends_with("online_account_number") {
        return validate_online_account_number(value, label_hints);
    }
    if path.ends_with("licensing_authority") && value.chars().all(|c| c.is_ascii_digit()) {
        return RuleOutcome::invalid("licensing_authority_numeric", -0.2);
    }
    match field_type {
        FieldType::Name => validate_name(value, label_hints),
        FieldType::Email => validate_email(value, label_hints),
        FieldType::Phone => validate_phone(value, label_hints),
        FieldType::PassportNumber => validate_passport_number(value),
        FieldType::Sex => validate_sex(value),
        FieldType::DatePast | FieldType::DateFuture => validate_date(value, field_type),
        FieldType::Zip => validate_zip(value, context.country.as_deref()),
        FieldType::State => validate_state(value),
        FieldType::Text | FieldType::Checkbox => {
            if looks_like_label_or_header(value, label_hints) {
                RuleOutcome::invalid("label_noise", -0.3)
            } else {
                RuleOutcome::ok("text_ok")
            }
        }
    }
}

pub fn is_us_state(value: &str) -> bool {
    US_STATES.contains(&value.trim().to_uppercase().as_str())
}
