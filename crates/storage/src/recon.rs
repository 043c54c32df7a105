//! Operator actions on the reconciliation state machine.
//!
//! Every action runs in one transaction: the line row, the candidate
//! back-reference and the status all move together or not at all. The
//! legal moves themselves live in `mutasi_core::transition`; this
//! module only persists them.

use crate::candidates::{claim_candidate, get_candidate_conn, held_by_line, release_for_line};
use crate::candidates::insert_candidate_for_line;
use crate::db::DbPool;
use crate::error::Result;
use crate::statements::get_line_conn;
use mutasi_core::{transition, CandidateKind, MatchRef, ReconError, ReconEvent, StatementLine};
use sqlx::sqlite::SqliteConnection;

/// Promote a suggested line to matched, keeping the candidate the
/// matcher picked for it.
pub async fn confirm_suggestion(pool: &DbPool, line_id: i64) -> Result<StatementLine> {
    let mut tx = pool.begin().await?;
    let line = get_line_conn(&mut tx, line_id).await?;
    let held = held_by_line(&mut tx, line_id)
        .await?
        .ok_or(ReconError::NoSuggestion(line_id))?;
    let next = transition(line.status, ReconEvent::Match)?;
    let target = MatchRef {
        kind: held.kind,
        id: held.id,
    };
    set_line_match(
        &mut tx,
        line_id,
        next.to_string(),
        Some(&target),
        Some(&format!("confirmed {target}")),
    )
    .await?;
    let updated = get_line_conn(&mut tx, line_id).await?;
    tx.commit().await?;
    tracing::info!("line {} confirmed against {}", line_id, target);
    Ok(updated)
}

/// Throw a suggestion away. The candidate goes back into the pool and
/// the line becomes matchable again.
pub async fn reject_suggestion(pool: &DbPool, line_id: i64) -> Result<StatementLine> {
    let mut tx = pool.begin().await?;
    let line = get_line_conn(&mut tx, line_id).await?;
    let next = transition(line.status, ReconEvent::Reject)?;
    release_for_line(&mut tx, line_id).await?;
    set_line_match(&mut tx, line_id, next.to_string(), None, None).await?;
    let updated = get_line_conn(&mut tx, line_id).await?;
    tx.commit().await?;
    Ok(updated)
}

/// Match a line against a candidate the operator picked by hand. Any
/// pending suggestion on the line is dropped first.
pub async fn link_line(
    pool: &DbPool,
    line_id: i64,
    kind: CandidateKind,
    candidate_id: i64,
) -> Result<StatementLine> {
    let mut tx = pool.begin().await?;
    let line = get_line_conn(&mut tx, line_id).await?;
    let next = transition(line.status, ReconEvent::Match)?;
    get_candidate_conn(&mut tx, kind, candidate_id).await?;
    release_for_line(&mut tx, line_id).await?;
    claim_candidate(&mut tx, kind, candidate_id, line_id).await?;
    let target = MatchRef {
        kind,
        id: candidate_id,
    };
    set_line_match(
        &mut tx,
        line_id,
        next.to_string(),
        Some(&target),
        Some(&format!("linked {target}")),
    )
    .await?;
    let updated = get_line_conn(&mut tx, line_id).await?;
    tx.commit().await?;
    tracing::info!("line {} linked to {}", line_id, target);
    Ok(updated)
}

/// Create a fresh candidate record from the line itself and settle the
/// line against it, for bank activity that was never entered anywhere
/// else.
pub async fn record_line(
    pool: &DbPool,
    line_id: i64,
    kind: CandidateKind,
) -> Result<StatementLine> {
    let mut tx = pool.begin().await?;
    let line = get_line_conn(&mut tx, line_id).await?;
    let next = transition(line.status, ReconEvent::Record)?;
    let candidate_id = insert_candidate_for_line(
        &mut tx,
        kind,
        line.date,
        line.amount(),
        Some(line.description.as_str()),
        line_id,
    )
    .await?;
    let target = MatchRef {
        kind,
        id: candidate_id,
    };
    set_line_match(
        &mut tx,
        line_id,
        next.to_string(),
        Some(&target),
        Some(&format!("recorded as {target}")),
    )
    .await?;
    let updated = get_line_conn(&mut tx, line_id).await?;
    tx.commit().await?;
    tracing::info!("line {} recorded as {}", line_id, target);
    Ok(updated)
}

/// Undo a match or a recording. The candidate record survives either
/// way; only the tie to this line is cut.
pub async fn unlink_line(pool: &DbPool, line_id: i64) -> Result<StatementLine> {
    let mut tx = pool.begin().await?;
    let line = get_line_conn(&mut tx, line_id).await?;
    let next = transition(line.status, ReconEvent::Unlink)?;
    release_for_line(&mut tx, line_id).await?;
    set_line_match(&mut tx, line_id, next.to_string(), None, None).await?;
    let updated = get_line_conn(&mut tx, line_id).await?;
    tx.commit().await?;
    Ok(updated)
}

async fn set_line_match(
    conn: &mut SqliteConnection,
    line_id: i64,
    status: String,
    target: Option<&MatchRef>,
    note: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "UPDATE statement_lines
         SET status = ?, matched_kind = ?, matched_id = ?, note = ?
         WHERE id = ?",
    )
    .bind(status)
    .bind(target.map(|t| t.kind.to_string()))
    .bind(target.map(|t| t.id))
    .bind(note)
    .bind(line_id)
    .execute(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::{get_candidate, insert_candidate};
    use crate::testutil::{seed_account, seed_line, test_db};
    use chrono::NaiveDate;
    use mutasi_core::{Money, ReconciliationStatus};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn seed_suggestion(pool: &DbPool, line_id: i64, kind: CandidateKind, id: i64) {
        let mut conn = pool.acquire().await.unwrap();
        claim_candidate(&mut conn, kind, id, line_id).await.unwrap();
        sqlx::query("UPDATE statement_lines SET status = 'suggested', note = 'suggestion' WHERE id = ?")
            .bind(line_id)
            .execute(&mut *conn)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn confirm_promotes_a_suggestion() {
        let (_dir, pool) = test_db().await;
        let account = seed_account(&pool).await;
        let line = seed_line(&pool, account, date(2025, 2, 5), 75_000_00, 0, "LISTRIK").await;
        let cand = insert_candidate(
            &pool,
            CandidateKind::Expense,
            date(2025, 2, 5),
            Money::from_cents(75_000_00),
            Some("Tagihan listrik"),
        )
        .await
        .unwrap();
        seed_suggestion(&pool, line, CandidateKind::Expense, cand.id).await;

        let updated = confirm_suggestion(&pool, line).await.unwrap();
        assert_eq!(updated.status, ReconciliationStatus::Matched);
        assert_eq!(
            updated.matched,
            Some(MatchRef { kind: CandidateKind::Expense, id: cand.id })
        );
        assert_eq!(updated.note.as_deref(), Some(&*format!("confirmed expense #{}", cand.id)));
    }

    #[tokio::test]
    async fn confirm_without_a_suggestion_errors() {
        let (_dir, pool) = test_db().await;
        let account = seed_account(&pool).await;
        let line = seed_line(&pool, account, date(2025, 2, 5), 100, 0, "LONE").await;
        let err = confirm_suggestion(&pool, line).await.unwrap_err();
        assert!(matches!(
            err,
            crate::StorageError::Recon(ReconError::NoSuggestion(_))
        ));
    }

    #[tokio::test]
    async fn reject_returns_the_candidate_to_the_pool() {
        let (_dir, pool) = test_db().await;
        let account = seed_account(&pool).await;
        let line = seed_line(&pool, account, date(2025, 2, 5), 100, 0, "NOISE").await;
        let cand = insert_candidate(
            &pool,
            CandidateKind::Receipt,
            date(2025, 2, 5),
            Money::from_cents(100),
            Some("wrong guess"),
        )
        .await
        .unwrap();
        seed_suggestion(&pool, line, CandidateKind::Receipt, cand.id).await;

        let updated = reject_suggestion(&pool, line).await.unwrap();
        assert_eq!(updated.status, ReconciliationStatus::Unmatched);
        assert_eq!(updated.matched, None);
        assert_eq!(updated.note, None);
        let released = get_candidate(&pool, CandidateKind::Receipt, cand.id)
            .await
            .unwrap();
        assert_eq!(released.statement_line_id, None);
    }

    #[tokio::test]
    async fn manual_link_claims_the_candidate() {
        let (_dir, pool) = test_db().await;
        let account = seed_account(&pool).await;
        let first = seed_line(&pool, account, date(2025, 2, 5), 0, 500, "TRF A").await;
        let second = seed_line(&pool, account, date(2025, 2, 6), 0, 500, "TRF B").await;
        let cand = insert_candidate(
            &pool,
            CandidateKind::FundTransfer,
            date(2025, 2, 5),
            Money::from_cents(500),
            Some("move to savings"),
        )
        .await
        .unwrap();

        let updated = link_line(&pool, first, CandidateKind::FundTransfer, cand.id)
            .await
            .unwrap();
        assert_eq!(updated.status, ReconciliationStatus::Matched);

        let err = link_line(&pool, second, CandidateKind::FundTransfer, cand.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::StorageError::Recon(ReconError::CandidateConflict { .. })
        ));
    }

    #[tokio::test]
    async fn record_mints_a_candidate_from_the_line() {
        let (_dir, pool) = test_db().await;
        let account = seed_account(&pool).await;
        let line = seed_line(&pool, account, date(2025, 2, 8), 35_000_00, 0, "BIAYA ADM").await;

        let updated = record_line(&pool, line, CandidateKind::Expense).await.unwrap();
        assert_eq!(updated.status, ReconciliationStatus::Recorded);
        let target = updated.matched.unwrap();
        assert_eq!(target.kind, CandidateKind::Expense);

        let minted = get_candidate(&pool, CandidateKind::Expense, target.id)
            .await
            .unwrap();
        assert_eq!(minted.date, date(2025, 2, 8));
        assert_eq!(minted.amount, Money::from_cents(35_000_00));
        assert_eq!(minted.memo.as_deref(), Some("BIAYA ADM"));
        assert_eq!(minted.statement_line_id, Some(line));
    }

    #[tokio::test]
    async fn unlink_reopens_the_line_and_keeps_the_record() {
        let (_dir, pool) = test_db().await;
        let account = seed_account(&pool).await;
        let line = seed_line(&pool, account, date(2025, 2, 8), 35_000_00, 0, "BIAYA ADM").await;
        let recorded = record_line(&pool, line, CandidateKind::Expense).await.unwrap();
        let target = recorded.matched.unwrap();

        let updated = unlink_line(&pool, line).await.unwrap();
        assert_eq!(updated.status, ReconciliationStatus::Unmatched);
        assert_eq!(updated.matched, None);
        assert!(updated.status.can_delete());

        let survivor = get_candidate(&pool, CandidateKind::Expense, target.id)
            .await
            .unwrap();
        assert_eq!(survivor.statement_line_id, None);
    }

    #[tokio::test]
    async fn illegal_moves_are_rejected() {
        let (_dir, pool) = test_db().await;
        let account = seed_account(&pool).await;
        let line = seed_line(&pool, account, date(2025, 2, 8), 100, 0, "X").await;
        record_line(&pool, line, CandidateKind::Expense).await.unwrap();

        let err = record_line(&pool, line, CandidateKind::Expense).await.unwrap_err();
        assert!(matches!(
            err,
            crate::StorageError::Recon(ReconError::InvalidTransition { .. })
        ));
    }
}
