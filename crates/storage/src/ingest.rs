//! Takes a statement source from file to stored rows: parse, dedup
//! against the account history, insert, and settle the upload record.

use crate::accounts::{get_account, get_account_conn};
use crate::db::DbPool;
use crate::error::Result;
use crate::statements::{create_upload, history_keys, insert_lines, mark_upload_failed};
use mutasi_core::AccountId;
use mutasi_import::{
    parse_statement, partition_duplicates, DuplicatePolicy, LineKey, ParseStats, ParsedLine,
    ParsedStatement, StatementMetadata, StatementSource,
};
use serde::Serialize;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Year for statements whose table carries day/month-only dates and
    /// whose metadata has no period line.
    pub statement_year: Option<i32>,
    pub duplicate_policy: DuplicatePolicy,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub upload_id: i64,
    pub inserted: usize,
    pub duplicates: usize,
    pub stats: ParseStats,
    pub metadata: StatementMetadata,
}

/// Parse results split the way an import dialog shows them, nothing
/// written yet.
#[derive(Debug, Clone, Serialize)]
pub struct ParsePreview {
    pub fresh: Vec<ParsedLine>,
    pub duplicates: Vec<ParsedLine>,
    pub stats: ParseStats,
    pub metadata: StatementMetadata,
}

pub async fn preview_statement(
    pool: &DbPool,
    account_id: AccountId,
    source: StatementSource,
    options: IngestOptions,
) -> Result<ParsePreview> {
    get_account(pool, account_id).await?;
    let ParsedStatement {
        lines,
        metadata,
        stats,
    } = parse_statement(source, options.statement_year)?;
    let mut conn = pool.acquire().await?;
    let history = history_keys(&mut conn, account_id).await?;
    let outcome = partition_duplicates(lines, &history);
    Ok(ParsePreview {
        fresh: outcome.fresh,
        duplicates: outcome.duplicates,
        stats,
        metadata,
    })
}

/// Run a whole upload synchronously. The upload row is created first,
/// so a parse failure still leaves a visible `failed` record.
pub async fn ingest_statement(
    pool: &DbPool,
    account_id: AccountId,
    source: StatementSource,
    source_name: &str,
    source_url: Option<&str>,
    options: IngestOptions,
) -> Result<IngestReport> {
    get_account(pool, account_id).await?;
    let upload_id = create_upload(pool, account_id, source_name, source_url).await?;
    complete_ingest(pool, account_id, upload_id, source, options).await
}

/// Like [`ingest_statement`], but the heavy work runs on a background
/// task. Returns the upload id right away so callers can show the
/// `processing` row, plus the handle for the final report.
pub async fn spawn_ingest(
    pool: &DbPool,
    account_id: AccountId,
    source: StatementSource,
    source_name: &str,
    source_url: Option<&str>,
    options: IngestOptions,
) -> Result<(i64, JoinHandle<Result<IngestReport>>)> {
    get_account(pool, account_id).await?;
    let upload_id = create_upload(pool, account_id, source_name, source_url).await?;
    let pool = pool.clone();
    let handle = tokio::spawn(async move {
        complete_ingest(&pool, account_id, upload_id, source, options).await
    });
    Ok((upload_id, handle))
}

async fn complete_ingest(
    pool: &DbPool,
    account_id: AccountId,
    upload_id: i64,
    source: StatementSource,
    options: IngestOptions,
) -> Result<IngestReport> {
    match finish_ingest(pool, account_id, upload_id, source, options).await {
        Ok(report) => Ok(report),
        Err(err) => {
            tracing::warn!("upload {} failed: {}", upload_id, err);
            if let Err(mark) = mark_upload_failed(pool, upload_id, &err.to_string()).await {
                tracing::warn!("could not record the failure on upload {}: {}", upload_id, mark);
            }
            Err(err)
        }
    }
}

async fn finish_ingest(
    pool: &DbPool,
    account_id: AccountId,
    upload_id: i64,
    source: StatementSource,
    options: IngestOptions,
) -> Result<IngestReport> {
    let ParsedStatement {
        lines,
        metadata,
        stats,
    } = parse_statement(source, options.statement_year)?;

    let mut tx = pool.begin().await?;
    let account = get_account_conn(&mut tx, account_id).await?;
    let history = history_keys(&mut tx, account_id).await?;
    let (to_insert, duplicates) = match options.duplicate_policy {
        DuplicatePolicy::Skip => {
            let outcome = partition_duplicates(lines, &history);
            (outcome.fresh, outcome.duplicates.len())
        }
        // everything goes in, in batch order; the count still reports
        // how many were re-uploads
        DuplicatePolicy::InsertAnyway => {
            let seen = lines
                .iter()
                .filter(|line| history.contains(&LineKey::of(line)))
                .count();
            (lines, seen)
        }
    };
    insert_lines(&mut tx, account_id, upload_id, &account.currency, &to_insert).await?;

    sqlx::query(
        "UPDATE statement_uploads
         SET status = 'imported', period_start = ?, period_end = ?,
             opening_balance_cents = ?, closing_balance_cents = ?,
             total_debit_cents = ?, total_credit_cents = ?,
             line_count = ?, error = NULL
         WHERE id = ?",
    )
    .bind(metadata.period.map(|p| p.start.to_string()))
    .bind(metadata.period.map(|p| p.end.to_string()))
    .bind(metadata.opening_balance.map(|m| m.to_cents()))
    .bind(metadata.closing_balance.map(|m| m.to_cents()))
    .bind(metadata.total_debit.map(|m| m.to_cents()))
    .bind(metadata.total_credit.map(|m| m.to_cents()))
    .bind(to_insert.len() as i64)
    .bind(upload_id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(
        "upload {}: stored {} lines, {} duplicates ({} rows seen)",
        upload_id,
        to_insert.len(),
        duplicates,
        stats.rows_seen
    );
    Ok(IngestReport {
        upload_id,
        inserted: to_insert.len(),
        duplicates,
        stats,
        metadata,
    })
}
