//! TD3 machine-readable zone parsing and check digits.
//!
//! OCR of the MRZ band is noisy: stray characters, dropped newlines, lines
//! concatenated into one. Extraction therefore recovers the two 44-char
//! lines by pattern, by tail-chunking a long line, and finally by a
//! check-digit-scored window search.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::normalize::{normalize_mrz_date, normalize_name, normalize_sex};

// Slight overrun allowed; a real MRZ line always carries filler '<'.
static MRZ_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9<]{30,46}$").unwrap());
static MRZ_CANDIDATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z0-9<]{30,46}").unwrap());

const MRZ_WEIGHTS: [u32; 3] = [7, 3, 1];

/// ICAO 9303 7-3-1 check digit over `0-9A-Z<`.
pub fn compute_check_digit(value: &str) -> char {
    let mut total: u32 = 0;
    for (i, ch) in value.chars().enumerate() {
        let v = match ch {
            '0'..='9' => ch as u32 - '0' as u32,
            '<' => 0,
            _ => ch as u32 - 55,
        };
        total += v * MRZ_WEIGHTS[i % 3];
    }
    char::from_digit(total % 10, 10).unwrap_or('0')
}

pub fn valid_check_digit(value: &str, check_digit: &str) -> bool {
    match check_digit.chars().next() {
        None | Some('<') => false,
        Some(digit) => compute_check_digit(value) == digit,
    }
}

fn normalize_mrz_line(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| c.is_ascii_alphanumeric() || *c == '<')
        .collect()
}

fn is_mrz_line(line: &str) -> bool {
    line.contains('<') && MRZ_LINE_RE.is_match(line)
}

fn extract_mrz_chunks(line: &str) -> Option<[String; 2]> {
    if line.len() >= 88 {
        let tail: String = line.chars().rev().take(88).collect::<Vec<_>>().into_iter().rev().collect();
        if tail.contains('<') {
            return Some([tail[..44].to_string(), tail[44..88].to_string()]);
        }
    }
    let chunks: Vec<&str> = MRZ_CANDIDATE_RE
        .find_iter(line)
        .map(|m| m.as_str())
        .filter(|chunk| chunk.contains('<'))
        .collect();
    if chunks.len() >= 2 {
        let a = chunks[chunks.len() - 2].to_string();
        let b = chunks[chunks.len() - 1].to_string();
        return Some([a, b]);
    }
    None
}

/// Recover the two TD3 lines from OCR text. Bottom-of-page bias: the last
/// two matching lines win.
pub fn extract_mrz_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut long_lines: Vec<String> = Vec::new();
    for raw in text.lines() {
        let line = normalize_mrz_line(raw);
        if is_mrz_line(&line) {
            lines.push(line);
        } else if line.len() >= 44 {
            long_lines.push(line);
        }
    }
    if lines.len() >= 2 {
        return lines.split_off(lines.len() - 2);
    }
    for line in long_lines.iter().rev() {
        if let Some(chunks) = extract_mrz_chunks(line) {
            debug!("recovered MRZ lines from a concatenated OCR line");
            return chunks.to_vec();
        }
    }
    // OCR sometimes drops every newline; retry over the flattened text.
    let normalized = normalize_mrz_line(text);
    if let Some(chunks) = extract_mrz_chunks(&normalized) {
        debug!("recovered MRZ lines from flattened text");
        return chunks.to_vec();
    }
    Vec::new()
}

fn best_line1(line: &str) -> String {
    if line.len() <= 44 {
        return line.to_string();
    }
    if let Some(start) = line.find("P<") {
        let candidate: String = line[start..].chars().take(44).collect();
        if candidate.len() >= 40 {
            return candidate;
        }
    }
    line[..44].to_string()
}

fn best_line2(line: &str) -> String {
    if line.len() <= 44 {
        return line.to_string();
    }
    let chars: Vec<char> = line.chars().collect();
    let mut best: String = chars[..44].iter().collect();
    let mut best_score = -1.0f64;
    for idx in 0..=(chars.len() - 44) {
        let candidate: String = chars[idx..idx + 44].iter().collect();
        if !candidate.contains('<') {
            continue;
        }
        let mut score = 0.0;
        if valid_check_digit(&candidate[0..9], &candidate[9..10]) {
            score += 2.0;
        }
        if valid_check_digit(&candidate[13..19], &candidate[19..20]) {
            score += 1.5;
        }
        if valid_check_digit(&candidate[21..27], &candidate[27..28]) {
            score += 1.5;
        }
        if candidate[10..13].chars().all(|c| c.is_ascii_uppercase()) {
            score += 0.5;
        }
        if matches!(&candidate[20..21], "M" | "F" | "X") {
            score += 0.25;
        }
        if score > best_score {
            best_score = score;
            best = candidate;
        }
    }
    best
}

/// Check-digit results for the three verifiable line-2 groups.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MrzChecks {
    pub passport_number: bool,
    pub date_of_birth: bool,
    pub date_of_expiration: bool,
}

impl MrzChecks {
    pub fn all_valid(&self) -> bool {
        self.passport_number && self.date_of_birth && self.date_of_expiration
    }
}

/// Parsed TD3 zone with normalized field values.
#[derive(Clone, Debug)]
pub struct MrzResult {
    pub document_code: String,
    pub surname: Option<String>,
    pub given_names: Option<String>,
    pub full_name: Option<String>,
    pub nationality: Option<String>,
    pub country_of_issue: Option<String>,
    pub passport_number: Option<String>,
    pub date_of_birth: Option<String>,
    pub date_of_expiration: Option<String>,
    pub sex: Option<String>,
    pub checks: MrzChecks,
    pub raw_lines: [String; 2],
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Surname/given-name fragments from the MRZ: filler stripped, title-cased,
/// capped at the last four tokens to shed OCR bleed-through.
pub fn normalize_passport_name(value: &str) -> Option<String> {
    let tokens: Vec<&str> = value
        .split(|c: char| !c.is_alphabetic() && c != '\'' && c != '-')
        .filter(|t| t.len() >= 2 || matches!(t.to_lowercase().as_str(), "de" | "la" | "du"))
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        return None;
    }
    let kept: Vec<&str> = if tokens.len() > 4 {
        tokens[tokens.len() - 4..].to_vec()
    } else {
        tokens
    };
    normalize_name(&kept.join(" "))
}

/// Parse the two 44-char TD3 lines of a passport identity page.
pub fn parse_mrz_td3(lines: &[String]) -> Option<MrzResult> {
    if lines.len() < 2 {
        return None;
    }
    let mut line1 = best_line1(&lines[0]);
    let mut line2 = best_line2(&lines[1]);
    while line1.len() < 44 {
        line1.push('<');
    }
    while line2.len() < 44 {
        line2.push('<');
    }
    line1.truncate(44);
    line2.truncate(44);

    let document_code = line1[0..2].to_string();
    let mut issuing_country = line1[2..5].replace('<', "");
    let mut names_raw = line1[5..44].to_string();

    let passport_number = non_empty(line2[0..9].replace('<', ""));
    let passport_cd = &line2[9..10];
    let nationality = non_empty(line2[10..13].replace('<', ""));
    let dob_raw = &line2[13..19];
    let dob_cd = &line2[19..20];
    let sex = &line2[20..21];
    let expiry_raw = &line2[21..27];
    let expiry_cd = &line2[27..28];

    // A dropped issuing-country code shifts the name field; trust the
    // nationality group when the two disagree.
    if let Some(nat) = nationality.as_deref() {
        if !issuing_country.is_empty() && issuing_country != nat {
            let pre = line1.split("<<").next().unwrap_or("");
            let pre = pre.strip_prefix("P<").unwrap_or(pre);
            if pre.len() >= 5 && !pre.starts_with(nat) {
                issuing_country = nat.to_string();
                names_raw = line1[2..44].to_string();
            }
        }
        if issuing_country.len() < 3 {
            issuing_country = nat.to_string();
        }
    }

    let mut name_parts = names_raw.split("<<");
    let surname_raw = name_parts.next().unwrap_or("").replace('<', " ");
    let given_raw = name_parts.collect::<Vec<_>>().join(" ").replace('<', " ");
    let surname = normalize_passport_name(surname_raw.trim());
    let given_names = normalize_passport_name(given_raw.trim());
    let full_name = match (&given_names, &surname) {
        (None, None) => None,
        (g, s) => normalize_name(
            &[g.as_deref(), s.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" "),
        ),
    };

    let checks = MrzChecks {
        passport_number: valid_check_digit(&line2[0..9], passport_cd),
        date_of_birth: valid_check_digit(dob_raw, dob_cd),
        date_of_expiration: valid_check_digit(expiry_raw, expiry_cd),
    };

    Some(MrzResult {
        document_code,
        surname,
        given_names,
        full_name,
        nationality,
        country_of_issue: non_empty(issuing_country),
        passport_number,
        date_of_birth: normalize_mrz_date(dob_raw, false),
        date_of_expiration: normalize_mrz_date(expiry_raw, true),
        sex: normalize_sex(sex),
        checks,
        raw_lines: [line1, line2],
    })
}

/// Parse straight from OCR text: line recovery plus TD3 parse.
pub fn extract_mrz_from_text(text: &str) -> Option<MrzResult> {
    let lines = extract_mrz_lines(text);
    if lines.is_empty() {
        return None;
    }
    parse_mrz_td3(&lines)
}

/// Validate the three line-2 check digits found in evidence text, if a
/// complete TD3 zone is present.
pub fn checks_from_evidence(evidence: &str) -> Option<MrzChecks> {
    let lines = extract_mrz_lines(evidence);
    if lines.len() < 2 || lines[0].len() < 44 || lines[1].len() < 44 {
        return None;
    }
    let line2 = &lines[1];
    Some(MrzChecks {
        passport_number: valid_check_digit(&line2[0..9], &line2[9..10]),
        date_of_birth: valid_check_digit(&line2[13..19], &line2[19..20]),
        date_of_expiration: valid_check_digit(&line2[21..27], &line2[27..28]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE1: &str = "P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<";
    const LINE2: &str = "L898902C36UTO7408122F1204159ZE184226B<<<<<10";

    fn specimen() -> MrzResult {
        parse_mrz_td3(&[LINE1.to_string(), LINE2.to_string()]).expect("specimen parses")
    }

    #[test]
    fn specimen_identity_fields() {
        let result = specimen();
        assert_eq!(result.surname.as_deref(), Some("Eriksson"));
        assert_eq!(result.given_names.as_deref(), Some("Anna Maria"));
        assert_eq!(result.passport_number.as_deref(), Some("L898902C3"));
        assert_eq!(result.date_of_birth.as_deref(), Some("1974-08-12"));
        assert_eq!(result.date_of_expiration.as_deref(), Some("2012-04-15"));
        assert_eq!(result.sex.as_deref(), Some("F"));
        assert_eq!(result.nationality.as_deref(), Some("UTO"));
        assert_eq!(result.country_of_issue.as_deref(), Some("UTO"));
    }

    #[test]
    fn specimen_check_digits_all_valid() {
        let result = specimen();
        assert!(result.checks.passport_number);
        assert!(result.checks.date_of_birth);
        assert!(result.checks.date_of_expiration);
        assert!(result.checks.all_valid());
    }

    #[test]
    fn check_digit_basics() {
        assert_eq!(compute_check_digit("L898902C3"), '6');
        assert!(valid_check_digit("L898902C3", "6"));
        assert!(!valid_check_digit("L898902C3", "7"));
        assert!(!valid_check_digit("L898902C3", "<"));
    }

    #[test]
    fn lines_recovered_from_noisy_text() {
        let text = format!(
            "REPUBLIC OF UTOPIA\nPASSPORT\n{}\n{}\n",
            "P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<< <<<<<<<<", LINE2
        );
        let lines = extract_mrz_lines(&text);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("P<UTOERIKSSON"));
    }

    #[test]
    fn concatenated_lines_recovered() {
        let text = format!("{}{}", LINE1, LINE2);
        let lines = extract_mrz_lines(&text);
        assert_eq!(lines.len(), 2);
        let result = parse_mrz_td3(&lines).expect("parses");
        assert_eq!(result.passport_number.as_deref(), Some("L898902C3"));
    }

    #[test]
    fn evidence_checks_detect_corruption() {
        let good = format!("{}\n{}", LINE1, LINE2);
        assert!(checks_from_evidence(&good).unwrap().all_valid());
        // Corrupt the passport number group.
        let bad = format!("{}\n{}", LINE1, LINE2.replacen("L898902C3", "L898902C4", 1));
        let checks = checks_from_evidence(&bad).unwrap();
        assert!(!checks.passport_number);
        assert!(checks.date_of_birth);
    }
}
