//! Scalar parsing shared by the row normalizer and the metadata scan:
//! amounts in mixed separator conventions, and the four date shapes
//! Indonesian bank exports actually use.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Indicator {
    Debit,
    Credit,
}

/// Day 0 of the spreadsheet serial calendar.
///
/// 1899-12-30 rather than 1900-01-01: the legacy serial scheme counts
/// from a phantom 1900-01-00 and also treats 1900 as a leap year, which
/// together shift every modern serial by two days.
pub(crate) fn serial_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap()
}

/// A bare number, optionally with a fractional part carrying the time
/// of day. Spreadsheet exports keep dates this way when the date
/// formatting is lost.
pub(crate) fn parse_serial_date(cell: &str) -> Option<NaiveDate> {
    let t = cell.trim();
    if t.is_empty() {
        return None;
    }
    let (int_part, frac) = match t.split_once('.') {
        Some((i, f)) => (i, f),
        None => (t, ""),
    };
    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !frac.is_empty() && !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let serial: i64 = int_part.parse().ok()?;
    if serial == 0 {
        return None;
    }
    serial_epoch().checked_add_days(Days::new(serial as u64))
}

pub(crate) fn serial_from_date(date: NaiveDate) -> i64 {
    (date - serial_epoch()).num_days()
}

/// dd/mm/yyyy or dd-mm-yyyy.
pub(crate) fn parse_dmy(cell: &str) -> Option<NaiveDate> {
    let t = cell.trim();
    for fmt in ["%d/%m/%Y", "%d-%m-%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(t, fmt) {
            return Some(d);
        }
    }
    None
}

/// dd/mm or dd-mm with the working year applied.
pub(crate) fn parse_dm(cell: &str, year: i32) -> Option<NaiveDate> {
    let t = cell.trim();
    let (d, m) = t.split_once(['/', '-'])?;
    let day: u32 = d.trim().parse().ok()?;
    let month: u32 = m.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// "12 Agu", "12 Agustus 2025", "3 March" and the like. The year token
/// is optional; without one the working year is required.
pub(crate) fn parse_day_month_name(cell: &str, year: Option<i32>) -> Option<NaiveDate> {
    let mut parts = cell.split_whitespace();
    let day: u32 = parts.next()?.parse().ok()?;
    let month = month_from_name(parts.next()?)?;
    let year = match parts.next() {
        Some(y) => y.parse().ok()?,
        None => year?,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// English and Indonesian month names and abbreviations.
pub(crate) fn month_from_name(name: &str) -> Option<u32> {
    match name.trim_end_matches('.').to_lowercase().as_str() {
        "jan" | "januari" | "january" => Some(1),
        "feb" | "peb" | "februari" | "february" => Some(2),
        "mar" | "maret" | "march" => Some(3),
        "apr" | "april" => Some(4),
        "may" | "mei" => Some(5),
        "jun" | "juni" | "june" => Some(6),
        "jul" | "juli" | "july" => Some(7),
        "aug" | "agu" | "agt" | "agustus" | "august" => Some(8),
        "sep" | "sept" | "september" => Some(9),
        "oct" | "okt" | "oktober" | "october" => Some(10),
        "nov" | "nopember" | "november" => Some(11),
        "dec" | "des" | "desember" | "december" => Some(12),
        _ => None,
    }
}

/// Parse an amount without knowing the locale up front.
///
/// When both `.` and `,` appear, whichever comes last is the decimal
/// separator. A lone `,` is a decimal separator; a lone `.` is a
/// grouping separator and is stripped, so "1.234" reads as 1234.
/// Currency labels and spaces are dropped; parentheses negate.
pub(crate) fn parse_amount(cell: &str) -> Option<Decimal> {
    let t = cell.trim();
    if t.is_empty() {
        return None;
    }
    let (negative, t) = if t.starts_with('(') && t.ends_with(')') && t.len() >= 2 {
        (true, &t[1..t.len() - 1])
    } else {
        (false, t)
    };
    let raw: String = t
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    if !raw.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    let cleaned = match (raw.rfind(','), raw.rfind('.')) {
        (Some(c), Some(d)) if d > c => raw.replace(',', ""),
        (Some(_), Some(_)) => raw.replace('.', "").replace(',', "."),
        (Some(_), None) => raw.replace(',', "."),
        (None, _) => raw.replace('.', ""),
    };
    let mut dec = Decimal::from_str(&cleaned).ok()?;
    if negative {
        dec = -dec;
    }
    Some(dec)
}

/// Split an inline trailing CR/DB marker off an amount cell.
pub(crate) fn split_indicator(cell: &str) -> (&str, Option<Indicator>) {
    let t = cell.trim();
    if let Some(head) = strip_suffix_ci(t, "CR") {
        return (head.trim_end(), Some(Indicator::Credit));
    }
    if let Some(head) = strip_suffix_ci(t, "DB") {
        return (head.trim_end(), Some(Indicator::Debit));
    }
    (t, None)
}

/// A cell that is nothing but a CR/DB marker, for layouts that keep
/// the indicator in its own column next to the amount.
pub(crate) fn parse_indicator(cell: &str) -> Option<Indicator> {
    let t = cell.trim();
    if t.eq_ignore_ascii_case("cr") {
        Some(Indicator::Credit)
    } else if t.eq_ignore_ascii_case("db") {
        Some(Indicator::Debit)
    } else {
        None
    }
}

fn strip_suffix_ci<'a>(t: &'a str, suffix: &str) -> Option<&'a str> {
    if t.len() < suffix.len() {
        return None;
    }
    let split = t.len() - suffix.len();
    if !t.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = t.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}
