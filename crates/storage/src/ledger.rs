use crate::accounts::get_account;
use crate::db::{parse_stored_date, DbPool};
use crate::error::Result;
use mutasi_core::{running_balance, AccountId, DateRange, LedgerEntry, LedgerView, Money, NormalBalance};

/// Running-balance view of an account's statement lines over `window`.
///
/// The stored opening balance is anchored at the account's opening
/// date; lines between the anchor and the window roll forward into the
/// window's opening figure. Statement lines follow the bank's
/// convention, credits increase the balance.
pub async fn statement_ledger(
    pool: &DbPool,
    account_id: AccountId,
    window: DateRange,
) -> Result<LedgerView> {
    let account = get_account(pool, account_id).await?;
    let anchor = account.opening_balance_date;

    let rows = sqlx::query_as::<_, (String, String, i64, i64)>(
        "SELECT txn_date, description, debit_cents, credit_cents
         FROM statement_lines
         WHERE account_id = ? AND txn_date >= ? AND txn_date <= ?
         ORDER BY txn_date, id",
    )
    .bind(account_id.0)
    .bind(anchor.to_string())
    .bind(window.end.to_string())
    .fetch_all(pool)
    .await?;
    let entries = rows
        .into_iter()
        .map(|r| LedgerEntry {
            date: parse_stored_date(&r.0),
            description: r.1,
            debit: Money::from_cents(r.2),
            credit: Money::from_cents(r.3),
        })
        .collect();

    Ok(running_balance(
        account.opening_balance,
        anchor,
        window,
        entries,
        NormalBalance::Credit,
    ))
}
