use crate::db::{parse_stored_date, DbPool};
use crate::error::Result;
use chrono::NaiveDate;
use mutasi_core::{CandidateKind, Money, ReconError};
use mutasi_import::CandidateSnapshot;
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;

/// Each candidate kind lives in its own table; the four tables share
/// one shape. All SQL against them goes through this mapping.
pub(crate) fn table_for(kind: CandidateKind) -> &'static str {
    match kind {
        CandidateKind::Expense => "expenses",
        CandidateKind::Receipt => "receipts",
        CandidateKind::FundTransfer => "fund_transfers",
        CandidateKind::JournalEntry => "journal_entries",
    }
}

#[derive(Debug, Clone)]
pub struct CandidateRecord {
    pub kind: CandidateKind,
    pub id: i64,
    pub date: NaiveDate,
    pub amount: Money,
    pub memo: Option<String>,
    /// Set while a statement line holds this record, whether as a
    /// suggestion or a settled match.
    pub statement_line_id: Option<i64>,
}

/// Insert a business record for the matcher to settle against. In a
/// full deployment these rows come from the bookkeeping modules; the
/// CLI and tests create them directly.
pub async fn insert_candidate(
    pool: &DbPool,
    kind: CandidateKind,
    date: NaiveDate,
    amount: Money,
    memo: Option<&str>,
) -> Result<CandidateRecord> {
    let sql = format!(
        "INSERT INTO {} (txn_date, amount_cents, memo) VALUES (?, ?, ?) RETURNING id",
        table_for(kind)
    );
    let row = sqlx::query(&sql)
        .bind(date.to_string())
        .bind(amount.to_cents())
        .bind(memo)
        .fetch_one(pool)
        .await?;
    let id: i64 = row.get("id");
    Ok(CandidateRecord {
        kind,
        id,
        date,
        amount,
        memo: memo.map(str::to_string),
        statement_line_id: None,
    })
}

pub async fn get_candidate(pool: &DbPool, kind: CandidateKind, id: i64) -> Result<CandidateRecord> {
    let mut conn = pool.acquire().await?;
    get_candidate_conn(&mut conn, kind, id).await
}

pub(crate) async fn get_candidate_conn(
    conn: &mut SqliteConnection,
    kind: CandidateKind,
    id: i64,
) -> Result<CandidateRecord> {
    let sql = format!(
        "SELECT id, txn_date, amount_cents, memo, statement_line_id FROM {} WHERE id = ?",
        table_for(kind)
    );
    let row = sqlx::query_as::<_, (i64, String, i64, Option<String>, Option<i64>)>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(r) => Ok(CandidateRecord {
            kind,
            id: r.0,
            date: parse_stored_date(&r.1),
            amount: Money::from_cents(r.2),
            memo: r.3,
            statement_line_id: r.4,
        }),
        None => Err(ReconError::CandidateNotFound { kind, id }.into()),
    }
}

pub async fn list_candidates(pool: &DbPool, kind: CandidateKind) -> Result<Vec<CandidateRecord>> {
    let sql = format!(
        "SELECT id, txn_date, amount_cents, memo, statement_line_id FROM {} ORDER BY id",
        table_for(kind)
    );
    let rows = sqlx::query_as::<_, (i64, String, i64, Option<String>, Option<i64>)>(&sql)
        .fetch_all(pool)
        .await?;
    Ok(rows
        .into_iter()
        .map(|r| CandidateRecord {
            kind,
            id: r.0,
            date: parse_stored_date(&r.1),
            amount: Money::from_cents(r.2),
            memo: r.3,
            statement_line_id: r.4,
        })
        .collect())
}

/// All records not yet held by any statement line, in creation order
/// within each kind. Kinds are visited in a fixed order so the
/// matcher's tie-breaks stay deterministic.
pub(crate) async fn unconsumed_candidates(
    conn: &mut SqliteConnection,
) -> Result<Vec<CandidateSnapshot>> {
    let mut out = Vec::new();
    for kind in CandidateKind::ALL {
        let sql = format!(
            "SELECT id, txn_date, amount_cents, memo FROM {}
             WHERE statement_line_id IS NULL ORDER BY id",
            table_for(kind)
        );
        let rows = sqlx::query_as::<_, (i64, String, i64, Option<String>)>(&sql)
            .fetch_all(&mut *conn)
            .await?;
        out.extend(rows.into_iter().map(|r| CandidateSnapshot {
            kind,
            id: r.0,
            date: parse_stored_date(&r.1),
            amount: Money::from_cents(r.2),
            memo: r.3,
        }));
    }
    Ok(out)
}

/// Claim a candidate for a statement line. Fails if the record is
/// already held by a different line.
pub(crate) async fn claim_candidate(
    conn: &mut SqliteConnection,
    kind: CandidateKind,
    id: i64,
    line_id: i64,
) -> Result<()> {
    let current = get_candidate_conn(&mut *conn, kind, id).await?;
    if let Some(holder) = current.statement_line_id {
        if holder != line_id {
            return Err(ReconError::CandidateConflict {
                kind,
                id,
                line_id: holder,
            }
            .into());
        }
        return Ok(());
    }
    let sql = format!(
        "UPDATE {} SET statement_line_id = ? WHERE id = ?",
        table_for(kind)
    );
    sqlx::query(&sql)
        .bind(line_id)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Release whatever candidate a line holds, across all four tables.
pub(crate) async fn release_for_line(conn: &mut SqliteConnection, line_id: i64) -> Result<()> {
    for kind in CandidateKind::ALL {
        let sql = format!(
            "UPDATE {} SET statement_line_id = NULL WHERE statement_line_id = ?",
            table_for(kind)
        );
        sqlx::query(&sql).bind(line_id).execute(&mut *conn).await?;
    }
    Ok(())
}

/// The candidate currently held by a line, if any.
pub(crate) async fn held_by_line(
    conn: &mut SqliteConnection,
    line_id: i64,
) -> Result<Option<CandidateRecord>> {
    for kind in CandidateKind::ALL {
        let sql = format!(
            "SELECT id, txn_date, amount_cents, memo, statement_line_id FROM {}
             WHERE statement_line_id = ?",
            table_for(kind)
        );
        let row = sqlx::query_as::<_, (i64, String, i64, Option<String>, Option<i64>)>(&sql)
            .bind(line_id)
            .fetch_optional(&mut *conn)
            .await?;
        if let Some(r) = row {
            return Ok(Some(CandidateRecord {
                kind,
                id: r.0,
                date: parse_stored_date(&r.1),
                amount: Money::from_cents(r.2),
                memo: r.3,
                statement_line_id: r.4,
            }));
        }
    }
    Ok(None)
}

/// Create a candidate directly from a statement line, already held by
/// it. Used by the record operation.
pub(crate) async fn insert_candidate_for_line(
    conn: &mut SqliteConnection,
    kind: CandidateKind,
    date: NaiveDate,
    amount: Money,
    memo: Option<&str>,
    line_id: i64,
) -> Result<i64> {
    let sql = format!(
        "INSERT INTO {} (txn_date, amount_cents, memo, statement_line_id)
         VALUES (?, ?, ?, ?) RETURNING id",
        table_for(kind)
    );
    let row = sqlx::query(&sql)
        .bind(date.to_string())
        .bind(amount.to_cents())
        .bind(memo)
        .bind(line_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row.get("id"))
}
