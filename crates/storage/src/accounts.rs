use crate::db::{parse_stored_date, DbPool};
use crate::error::Result;
use chrono::NaiveDate;
use mutasi_core::{AccountId, BankAccount, Money, ReconError};
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;

pub async fn create_account(
    pool: &DbPool,
    name: &str,
    currency: &str,
    opening_balance: Money,
    anchor: NaiveDate,
) -> Result<BankAccount> {
    let row = sqlx::query(
        "INSERT INTO bank_accounts (name, currency, opening_balance_cents, opening_balance_date)
         VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(name)
    .bind(currency)
    .bind(opening_balance.to_cents())
    .bind(anchor.to_string())
    .fetch_one(pool)
    .await?;
    let id: i64 = row.get("id");

    let mut account = BankAccount::new(name, currency, opening_balance, anchor);
    account.id = Some(AccountId(id));
    tracing::info!("created bank account {} ({})", name, id);
    Ok(account)
}

pub async fn get_account(pool: &DbPool, id: AccountId) -> Result<BankAccount> {
    let mut conn = pool.acquire().await?;
    get_account_conn(&mut conn, id).await
}

pub(crate) async fn get_account_conn(
    conn: &mut SqliteConnection,
    id: AccountId,
) -> Result<BankAccount> {
    let row = sqlx::query_as::<_, (i64, String, String, i64, String)>(
        "SELECT id, name, currency, opening_balance_cents, opening_balance_date
         FROM bank_accounts WHERE id = ?",
    )
    .bind(id.0)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(r) => Ok(account_from_row(r)),
        None => Err(ReconError::AccountNotFound(id).into()),
    }
}

pub async fn list_accounts(pool: &DbPool) -> Result<Vec<BankAccount>> {
    let rows = sqlx::query_as::<_, (i64, String, String, i64, String)>(
        "SELECT id, name, currency, opening_balance_cents, opening_balance_date
         FROM bank_accounts ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(account_from_row).collect())
}

fn account_from_row(r: (i64, String, String, i64, String)) -> BankAccount {
    BankAccount {
        id: Some(AccountId(r.0)),
        name: r.1,
        currency: r.2,
        opening_balance: Money::from_cents(r.3),
        opening_balance_date: parse_stored_date(&r.4),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_db;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn create_and_fetch_roundtrip() {
        let (_dir, pool) = test_db().await;
        let created = create_account(
            &pool,
            "BCA Giro",
            "IDR",
            Money::from_cents(100_000_000),
            date(2025, 1, 1),
        )
        .await
        .unwrap();
        let id = created.id.unwrap();

        let fetched = get_account(&pool, id).await.unwrap();
        assert_eq!(fetched.name, "BCA Giro");
        assert_eq!(fetched.currency, "IDR");
        assert_eq!(fetched.opening_balance, Money::from_cents(100_000_000));
        assert_eq!(fetched.opening_balance_date, date(2025, 1, 1));
    }

    #[tokio::test]
    async fn missing_account_is_an_error() {
        let (_dir, pool) = test_db().await;
        let err = get_account(&pool, AccountId(99)).await.unwrap_err();
        assert!(matches!(
            err,
            crate::StorageError::Recon(ReconError::AccountNotFound(AccountId(99)))
        ));
    }

    #[tokio::test]
    async fn list_returns_in_creation_order() {
        let (_dir, pool) = test_db().await;
        create_account(&pool, "BCA Giro", "IDR", Money::zero(), date(2025, 1, 1))
            .await
            .unwrap();
        create_account(&pool, "Mandiri Ops", "IDR", Money::zero(), date(2025, 1, 1))
            .await
            .unwrap();
        let all = list_accounts(&pool).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "BCA Giro");
        assert_eq!(all[1].name, "Mandiri Ops");
    }
}
