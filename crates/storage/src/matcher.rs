//! Runs the in-memory match engine over stored lines and persists its
//! verdicts.

use crate::accounts::get_account_conn;
use crate::candidates::{claim_candidate, unconsumed_candidates};
use crate::db::{parse_stored_date, DbPool};
use crate::error::Result;
use mutasi_core::{AccountId, Money, ReconciliationStatus};
use mutasi_import::{LineSnapshot, MatchEngine, MatchReport, MatchTier};
use std::str::FromStr;

/// Auto-match with the default thresholds.
pub async fn run_auto_match(pool: &DbPool, account_id: AccountId) -> Result<MatchReport> {
    run_auto_match_with(pool, account_id, &MatchEngine::default()).await
}

/// One matching pass over the whole account. Lines and candidates are
/// snapshotted, scored in memory, and the assignments written back in
/// the same transaction, so a concurrent ingest never sees a partially
/// applied pass.
pub async fn run_auto_match_with(
    pool: &DbPool,
    account_id: AccountId,
    engine: &MatchEngine,
) -> Result<MatchReport> {
    let mut tx = pool.begin().await?;
    get_account_conn(&mut tx, account_id).await?;

    let rows = sqlx::query_as::<_, (i64, String, String, String, i64, i64, String)>(
        "SELECT id, txn_date, description, reference, debit_cents, credit_cents, status
         FROM statement_lines WHERE account_id = ? ORDER BY txn_date, id",
    )
    .bind(account_id.0)
    .fetch_all(&mut *tx)
    .await?;
    let lines: Vec<LineSnapshot> = rows
        .into_iter()
        .map(|r| LineSnapshot {
            id: r.0,
            date: parse_stored_date(&r.1),
            description: r.2,
            reference: r.3,
            debit: Money::from_cents(r.4),
            credit: Money::from_cents(r.5),
            status: ReconciliationStatus::from_str(&r.6)
                .unwrap_or(ReconciliationStatus::Unmatched),
        })
        .collect();
    let candidates = unconsumed_candidates(&mut tx).await?;

    let (assignments, report) = engine.run(&lines, &candidates);

    for assignment in &assignments {
        claim_candidate(
            &mut tx,
            assignment.target.kind,
            assignment.target.id,
            assignment.line_id,
        )
        .await?;
        let pct = assignment.confidence * 100.0;
        match assignment.tier {
            MatchTier::Matched => {
                sqlx::query(
                    "UPDATE statement_lines
                     SET status = 'matched', matched_kind = ?, matched_id = ?, note = ?
                     WHERE id = ?",
                )
                .bind(assignment.target.kind.to_string())
                .bind(assignment.target.id)
                .bind(format!("auto-matched {} ({pct:.0}%)", assignment.target))
                .bind(assignment.line_id)
                .execute(&mut *tx)
                .await?;
            }
            // A suggestion holds the candidate but leaves the line's
            // match columns empty until someone confirms it.
            MatchTier::Suggested => {
                sqlx::query(
                    "UPDATE statement_lines SET status = 'suggested', note = ? WHERE id = ?",
                )
                .bind(format!("suggested {} ({pct:.0}%)", assignment.target))
                .bind(assignment.line_id)
                .execute(&mut *tx)
                .await?;
            }
        }
    }
    tx.commit().await?;

    tracing::info!(
        "auto-match for account {}: {} matched, {} suggested, {} already resolved",
        account_id,
        report.matched_count,
        report.suggested_count,
        report.skipped_count
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::{get_candidate, insert_candidate};
    use crate::statements::get_line;
    use crate::testutil::{seed_account, seed_line, test_db};
    use chrono::NaiveDate;
    use mutasi_core::CandidateKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn same_day_exact_amount_settles_as_matched() {
        let (_dir, pool) = test_db().await;
        let account = seed_account(&pool).await;
        let line = seed_line(
            &pool,
            account,
            date(2025, 2, 5),
            0,
            1_500_000_00,
            "TRF DARI PT MAJU",
        )
        .await;
        let cand = insert_candidate(
            &pool,
            CandidateKind::Receipt,
            date(2025, 2, 5),
            Money::from_cents(1_500_000_00),
            Some("Invoice PT Maju"),
        )
        .await
        .unwrap();

        let report = run_auto_match(&pool, account).await.unwrap();
        assert_eq!(report.matched_count, 1);
        assert_eq!(report.suggested_count, 0);

        let stored = get_line(&pool, line).await.unwrap();
        assert_eq!(stored.status, ReconciliationStatus::Matched);
        assert_eq!(stored.matched.map(|m| m.id), Some(cand.id));
        let held = get_candidate(&pool, CandidateKind::Receipt, cand.id)
            .await
            .unwrap();
        assert_eq!(held.statement_line_id, Some(line));
    }

    #[tokio::test]
    async fn near_date_without_overlap_is_only_suggested() {
        let (_dir, pool) = test_db().await;
        let account = seed_account(&pool).await;
        let line = seed_line(&pool, account, date(2025, 2, 5), 250_000_00, 0, "BYR VA 8812").await;
        let cand = insert_candidate(
            &pool,
            CandidateKind::Expense,
            date(2025, 2, 8),
            Money::from_cents(250_000_00),
            Some("supplier payment"),
        )
        .await
        .unwrap();

        let report = run_auto_match(&pool, account).await.unwrap();
        assert_eq!(report.matched_count, 0);
        assert_eq!(report.suggested_count, 1);

        let stored = get_line(&pool, line).await.unwrap();
        assert_eq!(stored.status, ReconciliationStatus::Suggested);
        assert_eq!(stored.matched, None);
        assert!(stored.note.as_deref().unwrap_or("").starts_with("suggested"));
        let held = get_candidate(&pool, CandidateKind::Expense, cand.id)
            .await
            .unwrap();
        assert_eq!(held.statement_line_id, Some(line));
    }

    #[tokio::test]
    async fn second_pass_reports_everything_as_resolved() {
        let (_dir, pool) = test_db().await;
        let account = seed_account(&pool).await;
        seed_line(&pool, account, date(2025, 2, 5), 0, 100_00, "TRF SATU").await;
        seed_line(&pool, account, date(2025, 2, 6), 200_00, 0, "TRF DUA").await;
        insert_candidate(
            &pool,
            CandidateKind::Receipt,
            date(2025, 2, 5),
            Money::from_cents(100_00),
            Some("trf satu"),
        )
        .await
        .unwrap();
        insert_candidate(
            &pool,
            CandidateKind::Expense,
            date(2025, 2, 8),
            Money::from_cents(200_00),
            Some("unrelated words"),
        )
        .await
        .unwrap();

        let first = run_auto_match(&pool, account).await.unwrap();
        assert_eq!(first.matched_count + first.suggested_count, 2);

        let second = run_auto_match(&pool, account).await.unwrap();
        assert_eq!(second.matched_count, 0);
        assert_eq!(second.suggested_count, 0);
        assert_eq!(second.skipped_count, 2);
    }

    #[tokio::test]
    async fn amounts_must_agree_to_the_cent() {
        let (_dir, pool) = test_db().await;
        let account = seed_account(&pool).await;
        let line = seed_line(&pool, account, date(2025, 2, 5), 0, 100_01, "TRF").await;
        insert_candidate(
            &pool,
            CandidateKind::Receipt,
            date(2025, 2, 5),
            Money::from_cents(100_00),
            Some("trf"),
        )
        .await
        .unwrap();

        let report = run_auto_match(&pool, account).await.unwrap();
        assert_eq!(report.matched_count, 0);
        assert_eq!(report.suggested_count, 0);
        let stored = get_line(&pool, line).await.unwrap();
        assert_eq!(stored.status, ReconciliationStatus::Unmatched);
    }

    #[tokio::test]
    async fn candidates_held_elsewhere_are_not_offered() {
        let (_dir, pool) = test_db().await;
        let account = seed_account(&pool).await;
        let taken = seed_line(&pool, account, date(2025, 2, 5), 0, 300_00, "FIRST").await;
        let hopeful = seed_line(&pool, account, date(2025, 2, 5), 0, 300_00, "SECOND").await;
        let cand = insert_candidate(
            &pool,
            CandidateKind::Receipt,
            date(2025, 2, 5),
            Money::from_cents(300_00),
            Some("only one"),
        )
        .await
        .unwrap();
        crate::recon::link_line(&pool, taken, CandidateKind::Receipt, cand.id)
            .await
            .unwrap();

        let report = run_auto_match(&pool, account).await.unwrap();
        assert_eq!(report.matched_count, 0);
        assert_eq!(report.suggested_count, 0);
        let stored = get_line(&pool, hopeful).await.unwrap();
        assert_eq!(stored.status, ReconciliationStatus::Unmatched);
    }
}
