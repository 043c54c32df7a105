pub mod accounts;
pub mod backup;
pub mod candidates;
pub mod db;
pub mod error;
pub mod ingest;
pub mod ledger;
pub mod matcher;
pub mod object_store;
pub mod recon;
pub mod statements;

pub use accounts::{create_account, get_account, list_accounts};
pub use backup::backup_to;
pub use candidates::{get_candidate, insert_candidate, list_candidates, CandidateRecord};
pub use db::{create_db, DbPool};
pub use error::{Result, StorageError};
pub use ingest::{
    ingest_statement, preview_statement, spawn_ingest, IngestOptions, IngestReport, ParsePreview,
};
pub use ledger::statement_ledger;
pub use matcher::{run_auto_match, run_auto_match_with};
pub use object_store::{sha256_bytes, statement_path, to_hex, FsObjectStore, ObjectStore};
pub use recon::{confirm_suggestion, link_line, record_line, reject_suggestion, unlink_line};
pub use statements::{
    clear_unmatched, delete_line, edit_line, get_line, get_upload, list_lines, list_uploads,
    ClearOutcome, LineEdit,
};

#[cfg(test)]
pub(crate) mod testutil {
    use crate::db::{create_db, DbPool};
    use chrono::NaiveDate;
    use mutasi_core::{AccountId, Money};
    use sqlx::Row;
    use tempfile::TempDir;

    /// A small BCA-style semicolon export shared across the tests.
    pub(crate) const SAMPLE_CSV: &[u8] = b"\
Nama :;BUDI SANTOSO
No. rekening :;1234567890
Periode :;01/02/2025 - 28/02/2025
Tanggal;Keterangan;Cabang;Mutasi;Saldo
;SALDO AWAL;;;1.000.000,00
01/02;TRF DARI PT MAJU;0000;1.500.000,00 CR;2.500.000,00
03/02;BYR LISTRIK PLN;0000;250.000,00 DB;2.250.000,00
Mutasi Debet :;250.000,00
Mutasi Kredit :;1.500.000,00
Saldo Akhir :;2.250.000,00
";

    pub(crate) async fn test_db() -> (TempDir, DbPool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_db(&dir.path().join("mutasi.db")).await.unwrap();
        (dir, pool)
    }

    /// One IDR account opened with 1,000,000.00 on 2025-01-01.
    pub(crate) async fn seed_account(pool: &DbPool) -> AccountId {
        crate::accounts::create_account(
            pool,
            "BCA Giro",
            "IDR",
            Money::from_cents(100_000_000),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        )
        .await
        .unwrap()
        .id
        .unwrap()
    }

    pub(crate) async fn seed_line(
        pool: &DbPool,
        account: AccountId,
        date: NaiveDate,
        debit_cents: i64,
        credit_cents: i64,
        description: &str,
    ) -> i64 {
        let row = sqlx::query(
            "INSERT INTO statement_lines
             (account_id, txn_date, description, debit_cents, credit_cents, currency)
             VALUES (?, ?, ?, ?, ?, 'IDR') RETURNING id",
        )
        .bind(account.0)
        .bind(date.to_string())
        .bind(description)
        .bind(debit_cents)
        .bind(credit_cents)
        .fetch_one(pool)
        .await
        .unwrap();
        row.get("id")
    }
}
