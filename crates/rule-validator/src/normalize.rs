//! Canonical value normalizers shared by rules, merge, and autofill readback.

use chrono::{Datelike, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NON_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D").unwrap());

const COUNTRY_ALIASES: &[(&str, &str)] = &[
    ("USA", "United States"),
    ("U.S.A.", "United States"),
    ("US", "United States"),
    ("U.S.", "United States"),
    ("UNITED STATES OF AMERICA", "United States"),
    ("UNITED STATES", "United States"),
];

fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn normalize_name(value: &str) -> Option<String> {
    let cleaned = WHITESPACE.replace_all(value.trim(), " ").to_string();
    if cleaned.is_empty() {
        return None;
    }
    Some(title_case(&cleaned))
}

pub fn normalize_sex(value: &str) -> Option<String> {
    let v = value.trim().to_uppercase();
    match v.as_str() {
        "M" | "F" | "X" => Some(v),
        _ => None,
    }
}

pub fn normalize_phone(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        return None;
    }
    let mut digits = NON_DIGIT.replace_all(value, "").to_string();
    if digits.len() == 11 && digits.starts_with('1') {
        digits.remove(0);
    }
    if digits.len() == 10 {
        return Some(format!(
            "{}-{}-{}",
            &digits[0..3],
            &digits[3..6],
            &digits[6..10]
        ));
    }
    Some(value.trim().to_string())
}

pub fn normalize_email(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_lowercase())
}

pub fn normalize_country(value: &str) -> Option<String> {
    let cleaned = WHITESPACE.replace_all(value.trim(), " ").to_string();
    if cleaned.is_empty() {
        return None;
    }
    let key = cleaned.to_uppercase();
    for (alias, canonical) in COUNTRY_ALIASES {
        if key == *alias {
            return Some(canonical.to_string());
        }
    }
    Some(title_case(&cleaned))
}

pub fn normalize_passport_number(value: &str) -> Option<String> {
    let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned.to_uppercase())
}

pub fn normalize_full_name(
    given: Option<&str>,
    middle: Option<&str>,
    family: Option<&str>,
) -> Option<String> {
    let parts: Vec<&str> = [given, middle, family].into_iter().flatten().collect();
    if parts.is_empty() {
        return None;
    }
    normalize_name(&parts.join(" "))
}

// Year-first and day-first format ladders tried in order; chrono has no
// dateutil-style guessing, so ambiguity is resolved by flag.
const YEAR_FIRST_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%y-%m-%d"];
const DAY_FIRST_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d/%m/%y"];
const MONTH_FIRST_FORMATS: &[&str] = &["%m/%d/%Y", "%m-%d-%Y", "%m/%d/%y"];
const TEXTUAL_FORMATS: &[&str] = &[
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d %b %y",
];

fn parse_with(formats: &[&str], raw: &str) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

fn mrz_six_digit(raw: &str) -> Option<NaiveDate> {
    if raw.len() != 6 || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year: i32 = raw[0..2].parse().ok()?;
    let month: u32 = raw[2..4].parse().ok()?;
    let day: u32 = raw[4..6].parse().ok()?;
    let current_two_digit = Local::now().year() % 100;
    let century = if year <= current_two_digit { 2000 } else { 1900 };
    NaiveDate::from_ymd_opt(century + year, month, day)
}

/// Normalize a date string to ISO `YYYY-MM-DD`.
///
/// `year_first` biases ambiguous numeric forms; pass `false` for documents
/// that write day-first, which also enables MRZ `YYMMDD` recovery.
pub fn normalize_date(value: &str, year_first: bool) -> Option<String> {
    let raw = WHITESPACE.replace_all(value.trim(), " ").to_string();
    if raw.is_empty() {
        return None;
    }
    if !year_first {
        if let Some(date) = mrz_six_digit(&raw) {
            return Some(date.to_string());
        }
    }
    let ladders: [&[&str]; 4] = if year_first {
        [
            YEAR_FIRST_FORMATS,
            TEXTUAL_FORMATS,
            MONTH_FIRST_FORMATS,
            DAY_FIRST_FORMATS,
        ]
    } else {
        [
            TEXTUAL_FORMATS,
            DAY_FIRST_FORMATS,
            YEAR_FIRST_FORMATS,
            MONTH_FIRST_FORMATS,
        ]
    };
    for formats in ladders {
        if let Some(date) = parse_with(formats, &raw) {
            return Some(date.to_string());
        }
    }
    None
}

/// MRZ date with per-field century disambiguation: an expiry date prefers
/// the nearest non-past candidate, a birth date the conventional century.
pub fn normalize_mrz_date(raw: &str, expiry: bool) -> Option<String> {
    let cleaned = raw.trim();
    if cleaned.len() == 6 && cleaned.chars().all(|c| c.is_ascii_digit()) {
        let year: i32 = cleaned[0..2].parse().ok()?;
        let month: u32 = cleaned[2..4].parse().ok()?;
        let day: u32 = cleaned[4..6].parse().ok()?;
        let candidates: Vec<NaiveDate> = [2000, 1900]
            .iter()
            .filter_map(|century| NaiveDate::from_ymd_opt(century + year, month, day))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        if expiry {
            let today = Local::now().date_naive();
            let chosen = candidates
                .iter()
                .filter(|c| **c >= today)
                .min()
                .or_else(|| candidates.iter().max())?;
            return Some(chosen.to_string());
        }
        return mrz_six_digit(cleaned).map(|d| d.to_string());
    }
    normalize_date(cleaned, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_title_cased() {
        assert_eq!(normalize_name("  anna   MARIA ").as_deref(), Some("Anna Maria"));
        assert_eq!(normalize_name("   "), None);
    }

    #[test]
    fn phones_formatted_when_ten_digits() {
        assert_eq!(
            normalize_phone("(555) 010-2030").as_deref(),
            Some("555-010-2030")
        );
        assert_eq!(
            normalize_phone("1-555-010-2030").as_deref(),
            Some("555-010-2030")
        );
        // Too short to reformat; passed through trimmed.
        assert_eq!(normalize_phone(" 12345 ").as_deref(), Some("12345"));
    }

    #[test]
    fn country_aliases_collapse() {
        assert_eq!(normalize_country("USA").as_deref(), Some("United States"));
        assert_eq!(
            normalize_country("united states of america").as_deref(),
            Some("United States")
        );
        assert_eq!(normalize_country("Utopia").as_deref(), Some("Utopia"));
    }

    #[test]
    fn date_formats_normalize_to_iso() {
        assert_eq!(
            normalize_date("1974-08-12", true).as_deref(),
            Some("1974-08-12")
        );
        assert_eq!(
            normalize_date("12 Aug 1974", false).as_deref(),
            Some("1974-08-12")
        );
        assert_eq!(
            normalize_date("Aug 12, 1974", true).as_deref(),
            Some("1974-08-12")
        );
        assert_eq!(normalize_date("not a date", true), None);
    }

    #[test]
    fn mrz_dates_pick_sensible_centuries() {
        assert_eq!(
            normalize_mrz_date("740812", false).as_deref(),
            Some("1974-08-12")
        );
        // Expired document: no future candidate, latest past one wins.
        assert_eq!(
            normalize_mrz_date("120415", true).as_deref(),
            Some("2012-04-15")
        );
    }
}
