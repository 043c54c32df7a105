use crate::db::{parse_stored_date, DbPool};
use crate::error::Result;
use chrono::NaiveDate;
use mutasi_core::{
    AccountId, CandidateKind, DateRange, MatchRef, Money, ReconError, ReconciliationStatus,
    StatementLine, StatementUpload, UploadStatus,
};
use mutasi_import::{LineKey, ParsedLine};
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;
use std::collections::HashSet;
use std::str::FromStr;

// ── uploads ─────────────────────────────────────────────────────────

pub(crate) async fn create_upload(
    pool: &DbPool,
    account_id: AccountId,
    source_name: &str,
    source_url: Option<&str>,
) -> Result<i64> {
    let row = sqlx::query(
        "INSERT INTO statement_uploads (account_id, source_name, source_url, status)
         VALUES (?, ?, ?, 'processing') RETURNING id",
    )
    .bind(account_id.0)
    .bind(source_name)
    .bind(source_url)
    .fetch_one(pool)
    .await?;
    Ok(row.get("id"))
}

pub(crate) async fn mark_upload_failed(pool: &DbPool, upload_id: i64, message: &str) -> Result<()> {
    sqlx::query("UPDATE statement_uploads SET status = 'failed', error = ? WHERE id = ?")
        .bind(message)
        .bind(upload_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_upload(pool: &DbPool, upload_id: i64) -> Result<StatementUpload> {
    let row = sqlx::query_as::<_, UploadRow>(&format!("{UPLOAD_SELECT} WHERE id = ?"))
        .bind(upload_id)
        .fetch_optional(pool)
        .await?;
    match row {
        Some(r) => Ok(upload_from_row(r)),
        None => Err(sqlx::Error::RowNotFound.into()),
    }
}

pub async fn list_uploads(pool: &DbPool, account_id: AccountId) -> Result<Vec<StatementUpload>> {
    let rows = sqlx::query_as::<_, UploadRow>(&format!(
        "{UPLOAD_SELECT} WHERE account_id = ? ORDER BY id"
    ))
    .bind(account_id.0)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(upload_from_row).collect())
}

const UPLOAD_SELECT: &str = "SELECT id, account_id, source_name, source_url, status,
    period_start, period_end, opening_balance_cents, closing_balance_cents,
    total_debit_cents, total_credit_cents, line_count, error, created_at
    FROM statement_uploads";

type UploadRow = (
    i64,
    i64,
    String,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    i64,
    Option<String>,
    String,
);

fn upload_from_row(r: UploadRow) -> StatementUpload {
    let period = match (&r.5, &r.6) {
        (Some(start), Some(end)) => Some(DateRange::new(
            parse_stored_date(start),
            parse_stored_date(end),
        )),
        _ => None,
    };
    StatementUpload {
        id: r.0,
        account_id: AccountId(r.1),
        source_name: r.2,
        source_url: r.3,
        status: UploadStatus::from_str(&r.4).unwrap_or(UploadStatus::Processing),
        period,
        opening_balance: r.7.map(Money::from_cents),
        closing_balance: r.8.map(Money::from_cents),
        total_debit: r.9.map(Money::from_cents),
        total_credit: r.10.map(Money::from_cents),
        line_count: r.11,
        error: r.12,
        created_at: r.13,
    }
}

// ── lines ───────────────────────────────────────────────────────────

/// Identity keys of every line the account has ever stored, for the
/// duplicate check.
pub(crate) async fn history_keys(
    conn: &mut SqliteConnection,
    account_id: AccountId,
) -> Result<HashSet<LineKey>> {
    let rows = sqlx::query_as::<_, (String, String, i64, i64, i64)>(
        "SELECT txn_date, description, debit_cents, credit_cents, balance_cents
         FROM statement_lines WHERE account_id = ?",
    )
    .bind(account_id.0)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| LineKey {
            date: parse_stored_date(&r.0),
            description: r.1,
            debit_cents: r.2,
            credit_cents: r.3,
            balance_cents: r.4,
        })
        .collect())
}

pub(crate) async fn insert_lines(
    conn: &mut SqliteConnection,
    account_id: AccountId,
    upload_id: i64,
    currency: &str,
    lines: &[ParsedLine],
) -> Result<()> {
    for line in lines {
        sqlx::query(
            "INSERT INTO statement_lines
             (account_id, upload_id, txn_date, description, reference,
              debit_cents, credit_cents, balance_cents, currency)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(account_id.0)
        .bind(upload_id)
        .bind(line.date.to_string())
        .bind(&line.description)
        .bind(&line.reference)
        .bind(line.debit.to_cents())
        .bind(line.credit.to_cents())
        .bind(line.balance.to_cents())
        .bind(currency)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

const LINE_SELECT: &str = "SELECT id, account_id, upload_id, txn_date, description, reference,
    debit_cents, credit_cents, balance_cents, currency, status, matched_kind, matched_id, note
    FROM statement_lines";

type LineRow = (
    i64,
    i64,
    Option<i64>,
    String,
    String,
    String,
    i64,
    i64,
    i64,
    String,
    String,
    Option<String>,
    Option<i64>,
    Option<String>,
);

fn line_from_row(r: LineRow) -> StatementLine {
    let matched = match (&r.11, r.12) {
        (Some(kind), Some(id)) => CandidateKind::from_str(kind)
            .ok()
            .map(|kind| MatchRef { kind, id }),
        _ => None,
    };
    StatementLine {
        id: r.0,
        account_id: AccountId(r.1),
        upload_id: r.2,
        date: parse_stored_date(&r.3),
        description: r.4,
        reference: r.5,
        debit: Money::from_cents(r.6),
        credit: Money::from_cents(r.7),
        balance: Money::from_cents(r.8),
        currency: r.9,
        status: ReconciliationStatus::from_str(&r.10).unwrap_or(ReconciliationStatus::Unmatched),
        matched,
        note: r.13,
    }
}

pub async fn get_line(pool: &DbPool, line_id: i64) -> Result<StatementLine> {
    let mut conn = pool.acquire().await?;
    get_line_conn(&mut conn, line_id).await
}

pub(crate) async fn get_line_conn(
    conn: &mut SqliteConnection,
    line_id: i64,
) -> Result<StatementLine> {
    let row = sqlx::query_as::<_, LineRow>(&format!("{LINE_SELECT} WHERE id = ?"))
        .bind(line_id)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(r) => Ok(line_from_row(r)),
        None => Err(ReconError::LineNotFound(line_id).into()),
    }
}

pub async fn list_lines(
    pool: &DbPool,
    account_id: AccountId,
    status: Option<ReconciliationStatus>,
) -> Result<Vec<StatementLine>> {
    let rows = match status {
        Some(status) => {
            sqlx::query_as::<_, LineRow>(&format!(
                "{LINE_SELECT} WHERE account_id = ? AND status = ? ORDER BY txn_date, id"
            ))
            .bind(account_id.0)
            .bind(status.to_string())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, LineRow>(&format!(
                "{LINE_SELECT} WHERE account_id = ? ORDER BY txn_date, id"
            ))
            .bind(account_id.0)
            .fetch_all(pool)
            .await?
        }
    };
    Ok(rows.into_iter().map(line_from_row).collect())
}

// ── edits and deletes ───────────────────────────────────────────────

/// Fields an operator may change on a stored line. `None` leaves the
/// field alone.
#[derive(Debug, Clone, Default)]
pub struct LineEdit {
    pub description: Option<String>,
    pub reference: Option<String>,
    pub date: Option<NaiveDate>,
    pub debit: Option<Money>,
    pub credit: Option<Money>,
}

impl LineEdit {
    /// Date and amount changes would invalidate an existing match, so
    /// they are restricted to unmatched lines.
    fn touches_matching_fields(&self) -> bool {
        self.date.is_some() || self.debit.is_some() || self.credit.is_some()
    }
}

pub async fn edit_line(pool: &DbPool, line_id: i64, edit: LineEdit) -> Result<StatementLine> {
    let mut tx = pool.begin().await?;
    let line = get_line_conn(&mut tx, line_id).await?;

    if edit.touches_matching_fields() && line.status != ReconciliationStatus::Unmatched {
        return Err(ReconError::EditBlocked {
            id: line_id,
            status: line.status,
        }
        .into());
    }

    let description = edit.description.unwrap_or(line.description);
    let reference = edit.reference.unwrap_or(line.reference);
    let date = edit.date.unwrap_or(line.date);
    let debit = edit.debit.unwrap_or(line.debit);
    let credit = edit.credit.unwrap_or(line.credit);

    sqlx::query(
        "UPDATE statement_lines
         SET description = ?, reference = ?, txn_date = ?, debit_cents = ?, credit_cents = ?
         WHERE id = ?",
    )
    .bind(&description)
    .bind(&reference)
    .bind(date.to_string())
    .bind(debit.to_cents())
    .bind(credit.to_cents())
    .bind(line_id)
    .execute(&mut *tx)
    .await?;

    let updated = get_line_conn(&mut tx, line_id).await?;
    tx.commit().await?;
    Ok(updated)
}

pub async fn delete_line(pool: &DbPool, line_id: i64) -> Result<()> {
    let mut tx = pool.begin().await?;
    let line = get_line_conn(&mut tx, line_id).await?;
    if !line.status.can_delete() {
        tracing::warn!("refused to delete line {} in state {}", line_id, line.status);
        return Err(ReconError::DeleteBlocked {
            id: line_id,
            status: line.status,
        }
        .into());
    }
    sqlx::query("DELETE FROM statement_lines WHERE id = ?")
        .bind(line_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearOutcome {
    pub deleted: u64,
    /// Lines inside the window left alone because they are suggested,
    /// matched or recorded.
    pub blocked: u64,
}

/// Delete every unmatched line of the account inside the window.
/// Settled and suggested lines survive, so a bad upload can be swept
/// away without touching reconciliation work.
pub async fn clear_unmatched(
    pool: &DbPool,
    account_id: AccountId,
    window: DateRange,
) -> Result<ClearOutcome> {
    let mut tx = pool.begin().await?;
    let (blocked,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM statement_lines
         WHERE account_id = ? AND txn_date >= ? AND txn_date <= ? AND status != 'unmatched'",
    )
    .bind(account_id.0)
    .bind(window.start.to_string())
    .bind(window.end.to_string())
    .fetch_one(&mut *tx)
    .await?;

    let result = sqlx::query(
        "DELETE FROM statement_lines
         WHERE account_id = ? AND txn_date >= ? AND txn_date <= ? AND status = 'unmatched'",
    )
    .bind(account_id.0)
    .bind(window.start.to_string())
    .bind(window.end.to_string())
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    let outcome = ClearOutcome {
        deleted: result.rows_affected(),
        blocked: blocked as u64,
    };
    tracing::info!(
        "cleared {} unmatched lines for account {} ({} kept)",
        outcome.deleted,
        account_id,
        outcome.blocked
    );
    Ok(outcome)
}
