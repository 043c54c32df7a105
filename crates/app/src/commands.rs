use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use mutasi_core::{AccountId, CandidateKind, DateRange, Money, ReconciliationStatus, StatementLine};
use mutasi_import::{DuplicatePolicy, ExtractedRow, StatementSource};
use mutasi_storage::{FsObjectStore, IngestOptions, LineEdit};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

use crate::AppContext;

/// How the bytes of an input file should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceFormat {
    /// Delimited text export (CSV with comma or semicolon)
    Csv,
    /// JSON array of row arrays, as produced by an OCR table pass
    Rows,
    /// Like rows, but from a spreadsheet export; dates may be serials
    Sheet,
    /// JSON array of already-extracted fields
    Extracted,
}

pub fn build_source(format: SourceFormat, bytes: Vec<u8>) -> Result<StatementSource> {
    Ok(match format {
        SourceFormat::Csv => StatementSource::Delimited(bytes),
        SourceFormat::Rows => {
            let rows: Vec<Vec<String>> =
                serde_json::from_slice(&bytes).context("parse rows JSON")?;
            StatementSource::OcrRows(rows)
        }
        SourceFormat::Sheet => {
            let rows: Vec<Vec<String>> =
                serde_json::from_slice(&bytes).context("parse sheet JSON")?;
            StatementSource::Spreadsheet(rows)
        }
        SourceFormat::Extracted => {
            let rows: Vec<ExtractedRow> =
                serde_json::from_slice(&bytes).context("parse extracted JSON")?;
            StatementSource::OcrExtracted(rows)
        }
    })
}

fn parse_kind(s: &str) -> Result<CandidateKind> {
    CandidateKind::from_str(s).map_err(anyhow::Error::msg)
}

fn parse_status(s: &str) -> Result<ReconciliationStatus> {
    ReconciliationStatus::from_str(s).map_err(anyhow::Error::msg)
}

pub fn init(ctx: &AppContext) -> Result<()> {
    let config = crate::config::init_config(&ctx.data_dir)?;
    println!("data directory   {}", ctx.data_dir.display());
    println!("database         {}", ctx.db_path.display());
    println!("statement files  {}", ctx.statements_dir.display());
    println!("config           {}", config.display());
    Ok(())
}

// ── accounts ────────────────────────────────────────────────────────

pub async fn account_add(
    ctx: &AppContext,
    name: &str,
    currency: &str,
    opening: Decimal,
    anchor: NaiveDate,
) -> Result<()> {
    let account = mutasi_storage::create_account(
        &ctx.db,
        name,
        currency,
        Money::from_decimal(opening),
        anchor,
    )
    .await?;
    let id = account.id.map(|i| i.0).unwrap_or_default();
    println!("account #{id} {name} ({currency}), opening {opening:.2} on {anchor}");
    Ok(())
}

pub async fn account_list(ctx: &AppContext) -> Result<()> {
    let accounts = mutasi_storage::list_accounts(&ctx.db).await?;
    if accounts.is_empty() {
        println!("no accounts yet; add one with `mutasi account add`");
        return Ok(());
    }
    println!("{:>4}  {:24}  {:8}  {:>16}  {}", "ID", "NAME", "CURRENCY", "OPENING", "ANCHOR");
    for a in accounts {
        println!(
            "{:>4}  {:24}  {:8}  {:>16}  {}",
            a.id.map(|i| i.0).unwrap_or_default(),
            a.name,
            a.currency,
            a.opening_balance.to_string(),
            a.opening_balance_date
        );
    }
    Ok(())
}

// ── ingest ──────────────────────────────────────────────────────────

pub async fn ingest(
    ctx: &AppContext,
    file: &Path,
    account: i64,
    year: Option<i32>,
    insert_duplicates: bool,
    format: SourceFormat,
    keep_file: bool,
) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("read {}", file.display()))?;
    let source_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("statement")
        .to_string();

    let stored = if keep_file {
        let ext = file.extension().and_then(|x| x.to_str()).unwrap_or("bin");
        let store = FsObjectStore::new(&ctx.statements_dir);
        Some(store.store(&bytes, ext)?)
    } else {
        None
    };

    let options = IngestOptions {
        statement_year: year,
        duplicate_policy: if insert_duplicates {
            DuplicatePolicy::InsertAnyway
        } else {
            DuplicatePolicy::Skip
        },
    };
    let report = mutasi_storage::ingest_statement(
        &ctx.db,
        AccountId(account),
        build_source(format, bytes)?,
        &source_name,
        stored.as_deref(),
        options,
    )
    .await?;

    println!(
        "upload #{}: {} lines stored, {} duplicates",
        report.upload_id, report.inserted, report.duplicates
    );
    let s = report.stats;
    println!(
        "  rows seen {}, dates skipped {}, amounts defaulted {}, side conflicts {}",
        s.rows_seen, s.dates_skipped, s.amounts_defaulted, s.side_conflicts
    );
    if let Some(period) = report.metadata.period {
        println!("  statement period {period}");
    }
    if let Some(kept) = stored {
        println!("  original kept at {kept}");
    }
    Ok(())
}

pub async fn preview(
    ctx: &AppContext,
    file: &Path,
    account: i64,
    year: Option<i32>,
    format: SourceFormat,
) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("read {}", file.display()))?;
    let options = IngestOptions {
        statement_year: year,
        ..IngestOptions::default()
    };
    let preview = mutasi_storage::preview_statement(
        &ctx.db,
        AccountId(account),
        build_source(format, bytes)?,
        options,
    )
    .await?;

    println!(
        "{} new lines, {} already in the account",
        preview.fresh.len(),
        preview.duplicates.len()
    );
    for line in &preview.fresh {
        println!(
            "  + {}  {:>16}  {:>16}  {}",
            line.date, line.debit, line.credit, line.description
        );
    }
    for line in &preview.duplicates {
        println!(
            "  = {}  {:>16}  {:>16}  {}",
            line.date, line.debit, line.credit, line.description
        );
    }
    let s = preview.stats;
    println!(
        "rows seen {}, dates skipped {}, amounts defaulted {}, side conflicts {}",
        s.rows_seen, s.dates_skipped, s.amounts_defaulted, s.side_conflicts
    );
    Ok(())
}

// ── matching and reconciliation ─────────────────────────────────────

pub async fn run_match(ctx: &AppContext, account: i64) -> Result<()> {
    let engine = ctx.config.matcher.engine();
    let report =
        mutasi_storage::run_auto_match_with(&ctx.db, AccountId(account), &engine).await?;
    println!(
        "{} matched, {} suggested, {} already resolved",
        report.matched_count, report.suggested_count, report.skipped_count
    );
    Ok(())
}

pub async fn lines(ctx: &AppContext, account: i64, status: Option<&str>) -> Result<()> {
    let status = status.map(parse_status).transpose()?;
    let lines = mutasi_storage::list_lines(&ctx.db, AccountId(account), status).await?;
    if lines.is_empty() {
        println!("no statement lines");
        return Ok(());
    }
    for line in &lines {
        print_line(line);
    }
    Ok(())
}

fn print_line(line: &StatementLine) {
    let side = if line.is_debit() {
        format!("{:>16} DB", line.debit.to_string())
    } else {
        format!("{:>16} CR", line.credit.to_string())
    };
    let tail = match (&line.matched, &line.note) {
        (Some(target), _) => format!("  [{target}]"),
        (None, Some(note)) => format!("  ({note})"),
        (None, None) => String::new(),
    };
    println!(
        "{:>5}  {}  {:9}  {}  {}{}",
        line.id, line.date, line.status.to_string(), side, line.description, tail
    );
}

pub async fn confirm(ctx: &AppContext, line: i64) -> Result<()> {
    let updated = mutasi_storage::confirm_suggestion(&ctx.db, line).await?;
    print_line(&updated);
    Ok(())
}

pub async fn reject(ctx: &AppContext, line: i64) -> Result<()> {
    let updated = mutasi_storage::reject_suggestion(&ctx.db, line).await?;
    print_line(&updated);
    Ok(())
}

pub async fn link(ctx: &AppContext, line: i64, kind: &str, id: i64) -> Result<()> {
    let updated = mutasi_storage::link_line(&ctx.db, line, parse_kind(kind)?, id).await?;
    print_line(&updated);
    Ok(())
}

pub async fn record(ctx: &AppContext, line: i64, kind: &str) -> Result<()> {
    let updated = mutasi_storage::record_line(&ctx.db, line, parse_kind(kind)?).await?;
    print_line(&updated);
    Ok(())
}

pub async fn unlink(ctx: &AppContext, line: i64) -> Result<()> {
    let updated = mutasi_storage::unlink_line(&ctx.db, line).await?;
    print_line(&updated);
    Ok(())
}

pub async fn delete(ctx: &AppContext, line: i64) -> Result<()> {
    mutasi_storage::delete_line(&ctx.db, line).await?;
    println!("line {line} deleted");
    Ok(())
}

pub async fn edit(
    ctx: &AppContext,
    line: i64,
    description: Option<String>,
    reference: Option<String>,
    date: Option<NaiveDate>,
    debit: Option<Decimal>,
    credit: Option<Decimal>,
) -> Result<()> {
    let edit = LineEdit {
        description,
        reference,
        date,
        debit: debit.map(Money::from_decimal),
        credit: credit.map(Money::from_decimal),
    };
    let updated = mutasi_storage::edit_line(&ctx.db, line, edit).await?;
    print_line(&updated);
    Ok(())
}

pub async fn clear(ctx: &AppContext, account: i64, from: NaiveDate, to: NaiveDate) -> Result<()> {
    let outcome =
        mutasi_storage::clear_unmatched(&ctx.db, AccountId(account), DateRange::new(from, to))
            .await?;
    println!(
        "{} unmatched lines deleted, {} resolved lines kept",
        outcome.deleted, outcome.blocked
    );
    Ok(())
}

// ── ledger ──────────────────────────────────────────────────────────

pub async fn ledger(ctx: &AppContext, account: i64, window: DateRange) -> Result<()> {
    let view = mutasi_storage::statement_ledger(&ctx.db, AccountId(account), window).await?;
    println!("{:>10}  {:>16}  {:>16}  {:>16}", "DATE", "DEBIT", "CREDIT", "BALANCE");
    println!("{:>10}  {:>16}  {:>16}  {:>16}  opening", window.start, "", "", view.opening.to_string());
    for row in &view.rows {
        let debit = if row.debit.is_zero() { String::new() } else { row.debit.to_string() };
        let credit = if row.credit.is_zero() { String::new() } else { row.credit.to_string() };
        println!(
            "{:>10}  {:>16}  {:>16}  {:>16}  {}",
            row.date, debit, credit, row.running.to_string(), row.description
        );
    }
    println!("{:>10}  {:>16}  {:>16}  {:>16}  closing", window.end, "", "", view.closing.to_string());
    Ok(())
}

pub fn resolve_window(
    month: Option<&str>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<DateRange> {
    if let (Some(from), Some(to)) = (from, to) {
        return Ok(DateRange::new(from, to));
    }
    if let Some(month) = month {
        let (y, m) = month
            .split_once('-')
            .context("month must look like 2025-02")?;
        let year: i32 = y.parse().context("month must look like 2025-02")?;
        let month: u32 = m.parse().context("month must look like 2025-02")?;
        return DateRange::month(year, month).context("no such month");
    }
    bail!("pass --month, or both --from and --to");
}

// ── candidates ──────────────────────────────────────────────────────

pub async fn candidate_add(
    ctx: &AppContext,
    kind: &str,
    date: NaiveDate,
    amount: Decimal,
    memo: Option<&str>,
) -> Result<()> {
    let record = mutasi_storage::insert_candidate(
        &ctx.db,
        parse_kind(kind)?,
        date,
        Money::from_decimal(amount),
        memo,
    )
    .await?;
    println!("{} #{} on {} for {}", record.kind, record.id, record.date, record.amount);
    Ok(())
}

pub async fn candidate_list(ctx: &AppContext, kind: &str) -> Result<()> {
    let records = mutasi_storage::list_candidates(&ctx.db, parse_kind(kind)?).await?;
    if records.is_empty() {
        println!("no records");
        return Ok(());
    }
    for r in records {
        let held = match r.statement_line_id {
            Some(line) => format!("  held by line {line}"),
            None => String::new(),
        };
        println!(
            "{:>5}  {}  {:>16}  {}{}",
            r.id,
            r.date,
            r.amount.to_string(),
            r.memo.as_deref().unwrap_or(""),
            held
        );
    }
    Ok(())
}

// ── uploads and backup ──────────────────────────────────────────────

pub async fn uploads(ctx: &AppContext, account: i64) -> Result<()> {
    let uploads = mutasi_storage::list_uploads(&ctx.db, AccountId(account)).await?;
    if uploads.is_empty() {
        println!("no uploads");
        return Ok(());
    }
    for u in uploads {
        let period = u
            .period
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        let error = u.error.map(|e| format!("  error: {e}")).unwrap_or_default();
        println!(
            "{:>4}  {}  {:10}  {:3} lines  {}  {}{}",
            u.id, u.created_at, u.status.to_string(), u.line_count, period, u.source_name, error
        );
    }
    Ok(())
}

pub async fn backup(ctx: &AppContext, dest: &Path) -> Result<()> {
    mutasi_storage::backup_to(&ctx.db, &ctx.db_path, &ctx.statements_dir, dest).await?;
    println!("backup written to {}", dest.display());
    Ok(())
}
