use crate::account::NormalBalance;
use crate::money::Money;
use crate::period::DateRange;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One movement feeding a ledger view. Storage produces these from
/// statement lines; the builder itself never touches the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub date: NaiveDate,
    pub description: String,
    pub debit: Money,
    pub credit: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRow {
    pub date: NaiveDate,
    pub description: String,
    pub debit: Money,
    pub credit: Money,
    pub running: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerView {
    pub opening: Money,
    pub rows: Vec<LedgerRow>,
    pub closing: Money,
}

/// Build a running-balance view over `window`.
///
/// The effective opening balance is the stored opening plus every
/// movement dated on or after `anchor` but before the window start, so
/// a view of any later month starts from the right figure without a
/// stored per-month balance. Entries dated before the anchor are
/// ignored entirely.
///
/// Within the window, rows run in date order; same-date ties put
/// credit-side entries before debit-side ones, then keep insertion
/// order. The closing balance is the last row's running balance, or
/// the effective opening when the window is empty.
pub fn running_balance(
    stored_opening: Money,
    anchor: NaiveDate,
    window: DateRange,
    entries: Vec<LedgerEntry>,
    normal: NormalBalance,
) -> LedgerView {
    let mut opening = stored_opening;
    let mut in_window: Vec<LedgerEntry> = Vec::new();
    for entry in entries {
        if entry.date < anchor {
            continue;
        }
        if entry.date < window.start {
            opening = opening + normal.signed(entry.debit, entry.credit);
        } else if window.contains(entry.date) {
            in_window.push(entry);
        }
    }

    // stable sort keeps insertion order within a (date, side) group
    in_window.sort_by_key(|e| (e.date, !e.debit.is_zero()));

    let mut running = opening;
    let mut rows = Vec::with_capacity(in_window.len());
    for entry in in_window {
        running = running + normal.signed(entry.debit, entry.credit);
        rows.push(LedgerRow {
            date: entry.date,
            description: entry.description,
            debit: entry.debit,
            credit: entry.credit,
            running,
        });
    }

    LedgerView {
        opening,
        rows,
        closing: running,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn debit(y: i32, m: u32, d: u32, cents: i64) -> LedgerEntry {
        LedgerEntry {
            date: date(y, m, d),
            description: "debit".to_string(),
            debit: Money::from_cents(cents),
            credit: Money::zero(),
        }
    }

    fn credit(y: i32, m: u32, d: u32, cents: i64) -> LedgerEntry {
        LedgerEntry {
            date: date(y, m, d),
            description: "credit".to_string(),
            debit: Money::zero(),
            credit: Money::from_cents(cents),
        }
    }

    fn feb() -> DateRange {
        DateRange::month(2025, 2).unwrap()
    }

    #[test]
    fn running_balance_accumulates_in_order() {
        // opening 1,000,000 then +500,000, -200,000, -100,000
        let view = running_balance(
            Money::from_cents(100_000_000),
            date(2025, 2, 1),
            feb(),
            vec![
                credit(2025, 2, 5, 50_000_000),
                debit(2025, 2, 7, 20_000_000),
                debit(2025, 2, 15, 10_000_000),
            ],
            NormalBalance::Credit,
        );
        assert_eq!(view.opening, Money::from_cents(100_000_000));
        let balances: Vec<i64> = view.rows.iter().map(|r| r.running.to_cents()).collect();
        assert_eq!(balances, vec![150_000_000, 130_000_000, 120_000_000]);
        assert_eq!(view.closing, Money::from_cents(120_000_000));
    }

    #[test]
    fn same_day_credits_come_before_debits() {
        let view = running_balance(
            Money::from_cents(100_000_000),
            date(2025, 2, 1),
            feb(),
            vec![
                debit(2025, 2, 10, 20_000_000),
                credit(2025, 2, 10, 50_000_000),
            ],
            NormalBalance::Credit,
        );
        assert!(view.rows[0].debit.is_zero());
        assert_eq!(view.rows[0].running, Money::from_cents(150_000_000));
        assert_eq!(view.rows[1].running, Money::from_cents(130_000_000));
    }

    #[test]
    fn pre_window_movements_roll_into_the_opening() {
        // anchor in January, window in February
        let view = running_balance(
            Money::from_cents(100_000_000),
            date(2025, 1, 1),
            feb(),
            vec![
                credit(2025, 1, 10, 30_000_000),
                debit(2025, 1, 20, 10_000_000),
                debit(2025, 2, 3, 5_000_000),
            ],
            NormalBalance::Credit,
        );
        assert_eq!(view.opening, Money::from_cents(120_000_000));
        assert_eq!(view.closing, Money::from_cents(115_000_000));
    }

    #[test]
    fn entries_before_the_anchor_are_ignored() {
        let view = running_balance(
            Money::from_cents(100_000_000),
            date(2025, 2, 1),
            feb(),
            vec![
                credit(2025, 1, 10, 999_999_99),
                debit(2025, 2, 7, 20_000_000),
            ],
            NormalBalance::Credit,
        );
        assert_eq!(view.opening, Money::from_cents(100_000_000));
        assert_eq!(view.closing, Money::from_cents(80_000_000));
    }

    #[test]
    fn empty_window_closes_at_the_opening() {
        let view = running_balance(
            Money::from_cents(100_000_000),
            date(2025, 1, 1),
            feb(),
            vec![credit(2025, 1, 5, 25_000_000)],
            NormalBalance::Credit,
        );
        assert!(view.rows.is_empty());
        assert_eq!(view.opening, Money::from_cents(125_000_000));
        assert_eq!(view.closing, view.opening);
    }

    #[test]
    fn debit_normal_view_flips_the_sign() {
        let view = running_balance(
            Money::from_cents(100_000_000),
            date(2025, 2, 1),
            feb(),
            vec![
                credit(2025, 2, 5, 50_000_000),
                debit(2025, 2, 7, 20_000_000),
            ],
            NormalBalance::Debit,
        );
        let balances: Vec<i64> = view.rows.iter().map(|r| r.running.to_cents()).collect();
        assert_eq!(balances, vec![50_000_000, 70_000_000]);
    }
}
