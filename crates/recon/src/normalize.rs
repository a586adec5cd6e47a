//! Field normalization: column names, amounts, dates, reference codes and
//! agency names.
//!
//! Nothing in here fails. Values that cannot be understood come back as
//! `None`, which the matchers treat as "never equal to anything".

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::config::{ReferenceRule, SliceRule};

/// Length of the reference code shared by both sides.
pub const REFERENCE_CODE_LEN: usize = 6;

pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Parse a free-form amount into minor units (hundredths).
///
/// Handles Indonesian (`5.000.000,00`) and English (`5,000,000.00`) grouping,
/// leading or trailing `Rp`/`IDR`/`$` markers, `(123)` and `-123` negatives.
/// A single separator after a one to three digit non-zero group and followed
/// by exactly three digits is read as grouping, so `5.000` is five thousand
/// while `0.500` is half. Fraction digits beyond the second must be zero.
pub fn parse_amount(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (paren_negative, inner) =
        if trimmed.len() >= 2 && trimmed.starts_with('(') && trimmed.ends_with(')') {
            (true, &trimmed[1..trimmed.len() - 1])
        } else {
            (false, trimmed)
        };

    let compact: String = inner
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let unmarked = strip_currency_markers(&compact);

    let (sign_negative, rest) = match unmarked.as_bytes().first() {
        Some(b'-') => (true, &unmarked[1..]),
        Some(b'+') => (false, &unmarked[1..]),
        _ => (false, unmarked),
    };
    let body = strip_currency_markers(rest);
    if paren_negative && sign_negative {
        return None;
    }
    if body.is_empty() || !body.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }

    let decimal_pos = decimal_marker_position(body)?;
    let (int_raw, frac_raw) = match decimal_pos {
        Some(pos) => (&body[..pos], &body[pos + 1..]),
        None => (body, ""),
    };

    let int_digits: String = int_raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if frac_raw.contains(['.', ',']) {
        return None;
    }
    if int_digits.is_empty() && frac_raw.is_empty() {
        return None;
    }

    let units: i64 = if int_digits.is_empty() {
        0
    } else {
        int_digits.parse().ok()?
    };

    let (kept, extra) = frac_raw.split_at(frac_raw.len().min(2));
    if extra.chars().any(|c| c != '0') {
        return None;
    }
    let cents: i64 = match kept.len() {
        0 => 0,
        1 => kept.parse::<i64>().ok()? * 10,
        _ => kept.parse().ok()?,
    };

    let minor = units.checked_mul(100)?.checked_add(cents)?;
    Some(if paren_negative || sign_negative { -minor } else { minor })
}

/// Currency markers are only recognised at either end of the amount.
fn strip_currency_markers(mut s: &str) -> &str {
    loop {
        let before = s.len();
        for marker in ["IDR", "RP", "$"] {
            s = s.strip_prefix(marker).unwrap_or(s);
            s = s.strip_suffix(marker).unwrap_or(s);
        }
        if s.len() == before {
            return s;
        }
    }
}

/// `Ok(Some(pos))` for a decimal marker, `Ok(None)` when every separator is
/// grouping. `None` when the separators are inconsistent.
fn decimal_marker_position(body: &str) -> Option<Option<usize>> {
    let dots = body.matches('.').count();
    let commas = body.matches(',').count();

    match (dots, commas) {
        (0, 0) => Some(None),
        (d, c) if d > 0 && c > 0 => {
            let last_dot = body.rfind('.')?;
            let last_comma = body.rfind(',')?;
            let (pos, count) = if last_dot > last_comma { (last_dot, d) } else { (last_comma, c) };
            if count == 1 {
                Some(Some(pos))
            } else {
                None
            }
        }
        (d, c) => {
            if d + c > 1 {
                return Some(None);
            }
            let pos = body.find(['.', ','])?;
            let digits_after = body.len() - pos - 1;
            let leading = &body[..pos];
            let leading_is_group =
                (1..=3).contains(&leading.len()) && leading.bytes().any(|b| b != b'0');
            if digits_after == 3 && leading_is_group {
                Some(None)
            } else {
                Some(Some(pos))
            }
        }
    }
}

/// Render minor units as `1234.50`.
pub fn format_amount(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Day-first, four digit years.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y/%m/%d"];

const SHORT_YEAR_FORMATS: &[&str] = &["%d/%m/%y", "%d-%m-%y", "%d.%m.%y"];

/// Parse a date in the formats found in Indonesian bank and treasury exports.
///
/// Numeric dates are read day-first. Month names may be Indonesian or English
/// (`01 Maret 2024`, `1-Mar-2024`). A trailing time of day is ignored.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    if let Some(date) = parse_numeric_date(s) {
        return Some(date);
    }

    // "2024-03-01 00:00" style values with an unusual time part.
    if let Some((head, _)) = s.split_once(' ') {
        if head.contains(['-', '/', '.']) {
            if let Some(date) = parse_numeric_date(head) {
                return Some(date);
            }
        }
    }

    parse_month_name_date(s)
}

fn parse_numeric_date(s: &str) -> Option<NaiveDate> {
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            if date.year() >= 1900 {
                return Some(date);
            }
        }
    }

    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = s[0..4].parse().ok()?;
        let month: u32 = s[4..6].parse().ok()?;
        let day: u32 = s[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    SHORT_YEAR_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn parse_month_name_date(s: &str) -> Option<NaiveDate> {
    let tokens: Vec<&str> = s
        .split(|c: char| c.is_whitespace() || matches!(c, '-' | '/' | '.' | ','))
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.len() != 3 {
        return None;
    }

    let day: u32 = tokens[0].parse().ok()?;
    let month = month_from_name(tokens[1])?;
    let year: i32 = match tokens[2].len() {
        4 => tokens[2].parse().ok()?,
        2 => 2000 + tokens[2].parse::<i32>().ok()?,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    let prefix: String = lower.chars().take(3).collect();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" | "peb" => 2,
        "mar" => 3,
        "apr" => 4,
        "mei" | "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "agu" | "ags" | "aug" => 8,
        "sep" => 9,
        "okt" | "oct" => 10,
        "nov" | "nop" => 11,
        "des" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

// ---------------------------------------------------------------------------
// Reference codes
// ---------------------------------------------------------------------------

fn digit_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+").expect("digit-run pattern is valid"))
}

/// Pull the 6-digit reference code out of a statement description.
pub fn extract_reference(description: &str, rule: ReferenceRule) -> Option<String> {
    let mut runs = digit_runs().find_iter(description).map(|m| m.as_str());
    match rule {
        ReferenceRule::LeftmostSix => runs
            .find(|run| run.len() == REFERENCE_CODE_LEN)
            .map(str::to_string),
        ReferenceRule::LastToken => runs.last().map(fit_to_code),
    }
}

/// Slice the 6-character reference code out of a payment order's reference
/// number, zero-padding short values.
pub fn slice_reference(reference_number: &str, rule: SliceRule) -> Option<String> {
    let trimmed = reference_number.trim();
    if trimmed.is_empty() {
        return None;
    }
    let chars: Vec<char> = trimmed.chars().collect();
    let slice: String = if chars.len() <= REFERENCE_CODE_LEN {
        trimmed.to_string()
    } else {
        match rule {
            SliceRule::LastSix => chars[chars.len() - REFERENCE_CODE_LEN..].iter().collect(),
            SliceRule::FirstSix => chars[..REFERENCE_CODE_LEN].iter().collect(),
        }
    };
    Some(format!("{slice:0>width$}", width = REFERENCE_CODE_LEN))
}

/// Keep the rightmost six digits, left-padding shorter runs with zeros.
fn fit_to_code(run: &str) -> String {
    let start = run.len().saturating_sub(REFERENCE_CODE_LEN);
    format!("{:0>width$}", &run[start..], width = REFERENCE_CODE_LEN)
}

// ---------------------------------------------------------------------------
// Agency names
// ---------------------------------------------------------------------------

/// Organizational-unit words stripped from the front of agency names.
pub const DEFAULT_AGENCY_PREFIXES: &[&str] = &[
    "DINAS",
    "BADAN",
    "KANTOR",
    "SEKRETARIAT",
    "BAGIAN",
    "UPTD",
    "UPT",
    "SATUAN",
    "UNIT",
    "PEMERINTAH",
    "KABUPATEN",
    "KOTA",
    "PROVINSI",
];

/// Uppercase, drop digits, turn punctuation into spaces, collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    let mapped: String = text
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_ascii_digit())
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Comparable agency name: normalized text with leading unit words removed.
/// The final word is always kept.
pub fn clean_agency_name(name: &str, prefixes: &[String]) -> String {
    let normalized = normalize_text(name);
    let mut words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();
    while words.len() > 1 && prefixes.iter().any(|p| p.eq_ignore_ascii_case(words[0])) {
        words.remove(0);
    }
    words.join(" ")
}

/// Whether a cleaned agency name occurs in an already-normalized description.
pub fn agency_matches(description_norm: &str, agency_clean: &str) -> bool {
    !agency_clean.is_empty() && description_norm.contains(agency_clean)
}
