use crate::candidates::table_for;
use crate::error::Result;
use chrono::NaiveDate;
use mutasi_core::CandidateKind;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;

pub type DbPool = Pool<Sqlite>;

/// Open (or create) the database and bring the schema up to date.
///
/// A single connection in WAL mode serializes every write; readers in
/// other processes are never blocked and concurrent uploads for the
/// same account queue up instead of interleaving.
pub async fn create_db(path: &Path) -> Result<DbPool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA cache_size = -32000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bank_accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            currency TEXT NOT NULL DEFAULT 'IDR',
            opening_balance_cents INTEGER NOT NULL DEFAULT 0,
            opening_balance_date TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS statement_uploads (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL REFERENCES bank_accounts(id),
            source_name TEXT NOT NULL,
            source_url TEXT,
            status TEXT NOT NULL DEFAULT 'processing',
            period_start TEXT,
            period_end TEXT,
            opening_balance_cents INTEGER,
            closing_balance_cents INTEGER,
            total_debit_cents INTEGER,
            total_credit_cents INTEGER,
            line_count INTEGER NOT NULL DEFAULT 0,
            error TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS statement_lines (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL REFERENCES bank_accounts(id),
            upload_id INTEGER REFERENCES statement_uploads(id),
            txn_date TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            reference TEXT NOT NULL DEFAULT '',
            debit_cents INTEGER NOT NULL DEFAULT 0,
            credit_cents INTEGER NOT NULL DEFAULT 0,
            balance_cents INTEGER NOT NULL DEFAULT 0,
            currency TEXT NOT NULL DEFAULT 'IDR',
            status TEXT NOT NULL DEFAULT 'unmatched',
            matched_kind TEXT,
            matched_id INTEGER,
            note TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            CHECK ((matched_kind IS NULL) = (matched_id IS NULL))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_statement_lines_account_date
         ON statement_lines(account_id, txn_date)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_statement_lines_dedup
         ON statement_lines(account_id, txn_date, debit_cents, credit_cents)",
    )
    .execute(pool)
    .await?;

    // the four candidate tables share one shape
    for kind in CandidateKind::ALL {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                txn_date TEXT NOT NULL,
                amount_cents INTEGER NOT NULL,
                memo TEXT,
                statement_line_id INTEGER REFERENCES statement_lines(id),
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
            table_for(kind)
        );
        sqlx::query(&sql).execute(pool).await?;
    }

    Ok(())
}

/// Dates are written by this crate in ISO form; anything else in the
/// column is hand-edited damage and falls back to the epoch.
pub(crate) fn parse_stored_date(s: &str) -> NaiveDate {
    s.parse().unwrap_or_default()
}
