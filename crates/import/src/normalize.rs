use crate::header::ColumnMap;
use crate::value::{self, Indicator};
use chrono::NaiveDate;
use mutasi_core::Money;
use serde::{Deserialize, Serialize};

/// Totals rows that terminate the transaction table. Anything below
/// them is footer material, never data.
const FOOTER_MARKERS: &[&str] = &["mutasi debet", "mutasi kredit", "saldo akhir"];

/// The opening-balance row carries no movement and is dropped; the
/// opening figure itself comes from the metadata scan.
const OPENING_MARKER: &str = "saldo awal";

/// One statement row reduced to typed fields, ready for insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedLine {
    pub date: NaiveDate,
    pub description: String,
    pub reference: String,
    pub debit: Money,
    pub credit: Money,
    pub balance: Money,
}

/// Row-level bookkeeping for the import report. Bad rows degrade data,
/// they never abort the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    /// Data rows inspected, not counting blank separators.
    pub rows_seen: usize,
    /// Rows that made it out as parsed lines.
    pub lines: usize,
    /// Rows dropped because the date would not parse.
    pub dates_skipped: usize,
    /// Amount or balance cells that fell back to zero.
    pub amounts_defaulted: usize,
    /// Rows dropped because both debit and credit were non-zero.
    pub side_conflicts: usize,
}

/// Walk the data rows below the header and produce normalized lines.
///
/// `start` is the index of the first data row. `year` is the working
/// year for day/month-only dates; rows needing it parse as failures
/// when it is absent.
pub fn normalize_rows(
    rows: &[Vec<String>],
    columns: &ColumnMap,
    start: usize,
    year: Option<i32>,
) -> (Vec<ParsedLine>, ParseStats) {
    let mut lines = Vec::new();
    let mut stats = ParseStats::default();

    for row in rows.iter().skip(start) {
        if row.iter().all(|c| c.is_empty()) {
            continue;
        }
        if marker_in_lead_cells(row, FOOTER_MARKERS) {
            break;
        }
        if marker_in_lead_cells(row, &[OPENING_MARKER]) {
            continue;
        }
        stats.rows_seen += 1;

        let date = match parse_row_date(cell(row, columns.date), year) {
            Some(d) => d,
            None => {
                stats.dates_skipped += 1;
                continue;
            }
        };

        let mut description = cell(row, columns.description).to_string();
        if let Some(detail) = columns.detail {
            let extra = cell(row, Some(detail));
            if description.is_empty() {
                description = extra.to_string();
            } else if !extra.is_empty() {
                description = format!("{description} {extra}");
            }
        }
        let reference = cell(row, columns.reference).to_string();

        let (debit, credit, defaulted) = if columns.has_split_sides() {
            let (debit, d1) = parse_side(cell(row, columns.debit));
            let (credit, d2) = parse_side(cell(row, columns.credit));
            (debit, credit, d1 + d2)
        } else {
            combined_sides(row, columns)
        };
        if !debit.is_zero() && !credit.is_zero() {
            stats.side_conflicts += 1;
            continue;
        }
        let (balance, d3) = parse_side(cell(row, columns.balance));
        stats.amounts_defaulted += defaulted + d3;

        stats.lines += 1;
        lines.push(ParsedLine {
            date,
            description,
            reference,
            debit,
            credit,
            balance,
        });
    }

    (lines, stats)
}

fn marker_in_lead_cells(row: &[String], markers: &[&str]) -> bool {
    row.iter().take(2).any(|c| {
        let lc = c.to_lowercase();
        markers.iter().any(|m| lc.contains(m))
    })
}

fn cell(row: &[String], idx: Option<usize>) -> &str {
    idx.and_then(|i| row.get(i)).map(String::as_str).unwrap_or("")
}

/// Date rules in priority order: spreadsheet serial, full dd/mm/yyyy,
/// dd/mm with the working year, then "12 Agu" style names.
fn parse_row_date(cell: &str, year: Option<i32>) -> Option<NaiveDate> {
    if let Some(d) = value::parse_serial_date(cell) {
        return Some(d);
    }
    if let Some(d) = value::parse_dmy(cell) {
        return Some(d);
    }
    if let Some(y) = year {
        if let Some(d) = value::parse_dm(cell, y) {
            return Some(d);
        }
    }
    value::parse_day_month_name(cell, year)
}

/// Parse one amount cell. Empty cells are a normal zero; non-empty
/// cells that fail to parse become zero and are counted.
fn parse_side(raw: &str) -> (Money, usize) {
    let t = raw.trim();
    if t.is_empty() {
        return (Money::zero(), 0);
    }
    match value::parse_amount(t) {
        Some(dec) => (Money::from_decimal(dec), 0),
        None => (Money::zero(), 1),
    }
}

/// Single amount column plus a CR/DB indicator, either inline behind
/// the number or in the adjacent cell. Without any indicator a positive
/// amount is a debit and a negative one a credit.
fn combined_sides(row: &[String], columns: &ColumnMap) -> (Money, Money, usize) {
    let Some(amount_idx) = columns.amount else {
        return (Money::zero(), Money::zero(), 0);
    };
    let raw = cell(row, Some(amount_idx));
    let (number, inline) = value::split_indicator(raw);
    let (amount, defaulted) = parse_side(number);
    let indicator = inline.or_else(|| value::parse_indicator(cell(row, Some(amount_idx + 1))));

    match indicator {
        Some(Indicator::Credit) => (Money::zero(), amount, defaulted),
        Some(Indicator::Debit) => (amount, Money::zero(), defaulted),
        None if amount.is_negative() => (Money::zero(), amount.abs(), defaulted),
        None => (amount, Money::zero(), defaulted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(lines: &[&[&str]]) -> Vec<Vec<String>> {
        lines
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn bca_columns() -> ColumnMap {
        ColumnMap {
            date: Some(0),
            description: Some(1),
            reference: Some(2),
            amount: Some(3),
            balance: Some(4),
            ..ColumnMap::default()
        }
    }

    fn split_columns() -> ColumnMap {
        ColumnMap {
            date: Some(0),
            description: Some(1),
            debit: Some(2),
            credit: Some(3),
            balance: Some(4),
            ..ColumnMap::default()
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn inline_indicator_assigns_the_side() {
        let data = rows(&[
            &["05/02", "TRF DARI ANDI", "0111", "500.000,00 CR", "1.500.000,00"],
            &["07/02", "BYR LISTRIK", "0111", "200.000,00 DB", "1.300.000,00"],
        ]);
        let (lines, stats) = normalize_rows(&data, &bca_columns(), 0, Some(2025));
        assert_eq!(stats.lines, 2);
        assert_eq!(lines[0].date, date(2025, 2, 5));
        assert_eq!(lines[0].credit, Money::from_cents(50_000_000));
        assert!(lines[0].debit.is_zero());
        assert_eq!(lines[1].debit, Money::from_cents(20_000_000));
        assert_eq!(lines[1].balance, Money::from_cents(130_000_000));
    }

    #[test]
    fn indicator_in_the_adjacent_cell() {
        let columns = ColumnMap {
            date: Some(0),
            description: Some(1),
            amount: Some(2),
            balance: Some(4),
            ..ColumnMap::default()
        };
        let data = rows(&[&["05/02", "SETORAN", "250.000,00", "CR", "1.250.000,00"]]);
        let (lines, _) = normalize_rows(&data, &columns, 0, Some(2025));
        assert_eq!(lines[0].credit, Money::from_cents(25_000_000));
    }

    #[test]
    fn no_indicator_defaults_positive_to_debit() {
        let data = rows(&[
            &["05/02", "ADMIN FEE", "", "15.000,00", ""],
            &["06/02", "REFUND", "", "-15.000,00", ""],
        ]);
        let (lines, _) = normalize_rows(&data, &bca_columns(), 0, Some(2025));
        assert_eq!(lines[0].debit, Money::from_cents(1_500_000));
        assert!(lines[0].credit.is_zero());
        assert_eq!(lines[1].credit, Money::from_cents(1_500_000));
        assert!(lines[1].debit.is_zero());
    }

    #[test]
    fn split_columns_read_each_side() {
        let data = rows(&[
            &["05/02/2025", "PAYMENT IN", "", "750.000,00", "2.000.000,00"],
            &["06/02/2025", "PAYMENT OUT", "300.000,00", "", "1.700.000,00"],
        ]);
        let (lines, stats) = normalize_rows(&data, &split_columns(), 0, None);
        assert_eq!(stats.lines, 2);
        assert_eq!(lines[0].credit, Money::from_cents(75_000_000));
        assert_eq!(lines[1].debit, Money::from_cents(30_000_000));
        assert_eq!(stats.amounts_defaulted, 0);
    }

    #[test]
    fn footer_marker_stops_the_walk() {
        let data = rows(&[
            &["05/02", "TRF MASUK", "", "100,00 CR", "1.100,00"],
            &["MUTASI KREDIT", "100,00"],
            &["06/02", "GHOST ROW", "", "999,00 CR", "9.999,00"],
        ]);
        let (lines, stats) = normalize_rows(&data, &bca_columns(), 0, Some(2025));
        assert_eq!(lines.len(), 1);
        assert_eq!(stats.rows_seen, 1);
    }

    #[test]
    fn opening_balance_row_is_skipped_not_counted() {
        let data = rows(&[
            &["01/02", "SALDO AWAL", "", "", "1.000.000,00"],
            &["05/02", "TRF MASUK", "", "100,00 CR", "1.000.100,00"],
        ]);
        let (lines, stats) = normalize_rows(&data, &bca_columns(), 0, Some(2025));
        assert_eq!(lines.len(), 1);
        assert_eq!(stats.rows_seen, 1);
        assert_eq!(stats.dates_skipped, 0);
    }

    #[test]
    fn unparsable_dates_skip_and_count() {
        let data = rows(&[
            &["??", "BROKEN", "", "100,00 CR", ""],
            &["", "PENDING", "", "100,00 CR", ""],
            &["05/02", "GOOD", "", "100,00 CR", ""],
        ]);
        let (lines, stats) = normalize_rows(&data, &bca_columns(), 0, Some(2025));
        assert_eq!(lines.len(), 1);
        assert_eq!(stats.rows_seen, 3);
        assert_eq!(stats.dates_skipped, 2);
    }

    #[test]
    fn day_month_rows_without_a_year_cannot_parse() {
        let data = rows(&[&["05/02", "NO YEAR", "", "100,00 CR", ""]]);
        let (lines, stats) = normalize_rows(&data, &bca_columns(), 0, None);
        assert!(lines.is_empty());
        assert_eq!(stats.dates_skipped, 1);
    }

    #[test]
    fn unparsable_amounts_default_to_zero_and_count() {
        let data = rows(&[&["05/02", "ODD", "", "1,2,3", "n/a"]]);
        let (lines, stats) = normalize_rows(&data, &bca_columns(), 0, Some(2025));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].debit.is_zero());
        assert!(lines[0].balance.is_zero());
        assert_eq!(stats.amounts_defaulted, 2);
    }

    #[test]
    fn rows_with_both_sides_set_are_dropped_and_counted() {
        let data = rows(&[&["05/02/2025", "WEIRD", "100,00", "200,00", ""]]);
        let (lines, stats) = normalize_rows(&data, &split_columns(), 0, None);
        assert!(lines.is_empty());
        assert_eq!(stats.side_conflicts, 1);
    }

    #[test]
    fn detail_column_extends_the_description() {
        let columns = ColumnMap {
            date: Some(0),
            description: Some(1),
            detail: Some(2),
            amount: Some(3),
            ..ColumnMap::default()
        };
        let data = rows(&[&["05/02", "TRSF E-BANKING", "DARI ANDI WIJAYA", "100,00 CR"]]);
        let (lines, _) = normalize_rows(&data, &columns, 0, Some(2025));
        assert_eq!(lines[0].description, "TRSF E-BANKING DARI ANDI WIJAYA");
    }

    #[test]
    fn serial_dates_parse_without_a_year() {
        let data = rows(&[&["45658", "NEW YEAR TXN", "", "100,00 CR", ""]]);
        let (lines, _) = normalize_rows(&data, &bca_columns(), 0, None);
        assert_eq!(lines[0].date, date(2025, 1, 1));
    }
}
