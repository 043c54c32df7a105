use crate::value;
use chrono::{Datelike, NaiveDate};
use mutasi_core::{DateRange, Money};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_period_range, r"(\d{1,2})/(\d{1,2})/(\d{4})\s*-\s*(\d{1,2})/(\d{1,2})/(\d{4})");
re!(re_numeric_token, r"\d[\d.,]*");

/// Figures read off the statement's own header and footer rows. They
/// are stored with the upload as the bank reported them; nothing
/// cross-checks them against the parsed lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementMetadata {
    pub period: Option<DateRange>,
    pub opening_balance: Option<Money>,
    pub closing_balance: Option<Money>,
    pub total_debit: Option<Money>,
    pub total_credit: Option<Money>,
}

impl StatementMetadata {
    /// The period start fixes the working year for day/month-only
    /// dates in the table.
    pub fn working_year(&self) -> Option<i32> {
        self.period.map(|p| p.start.year())
    }
}

/// Scan every row of the document for marker rows. Position does not
/// matter; BCA puts the period above the table and the totals below it.
pub fn extract_metadata(rows: &[Vec<String>]) -> StatementMetadata {
    let mut meta = StatementMetadata::default();
    for row in rows {
        let joined = row.join(" ").to_lowercase();
        if meta.period.is_none() && joined.contains("periode") {
            meta.period = parse_period(&joined);
        }
        // one amount per marker row; first qualifying row wins
        if meta.total_debit.is_none() && joined.contains("mutasi debet") {
            meta.total_debit = amount_after(&joined, "mutasi debet");
        } else if meta.total_credit.is_none() && joined.contains("mutasi kredit") {
            meta.total_credit = amount_after(&joined, "mutasi kredit");
        } else if meta.opening_balance.is_none() && joined.contains("saldo awal") {
            meta.opening_balance = amount_after(&joined, "saldo awal");
        } else if meta.closing_balance.is_none() && joined.contains("saldo akhir") {
            meta.closing_balance = amount_after(&joined, "saldo akhir");
        }
    }
    meta
}

fn parse_period(text: &str) -> Option<DateRange> {
    let caps = re_period_range().captures(text)?;
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    let start = NaiveDate::from_ymd_opt(num(3)? as i32, num(2)?, num(1)?)?;
    let end = NaiveDate::from_ymd_opt(num(6)? as i32, num(5)?, num(4)?)?;
    Some(DateRange::new(start, end))
}

/// First numeric-looking token after the marker text.
fn amount_after(text: &str, marker: &str) -> Option<Money> {
    let pos = text.find(marker)?;
    let tail = &text[pos + marker.len()..];
    let token = re_numeric_token().find(tail)?;
    value::parse_amount(token.as_str()).map(Money::from_decimal)
}
