use log::trace;
use lpg_common::Kopek;
use sqlx::{PgConnection, PgPool};

/// Current balance: accruals over PROCESSED orders minus all withdrawals, both coalesced to zero.
pub async fn fetch_balance(user_id: i64, conn: &mut PgConnection) -> Result<Kopek, sqlx::Error> {
    sqlx::query_scalar(
        r#"
            SELECT (
                COALESCE((
                    SELECT SUM(o.accrual) FROM orders o
                    WHERE o.user_id = $1 AND o.status = 'PROCESSED'
                ), 0)
                -
                COALESCE((
                    SELECT SUM(w.sum) FROM withdrawals w
                    WHERE w.user_id = $1
                ), 0)
            )::bigint AS balance_kopeks;
        "#,
    )
    .bind(user_id)
    .fetch_one(conn)
    .await
}

pub async fn fetch_withdrawals_sum(user_id: i64, conn: &mut PgConnection) -> Result<Kopek, sqlx::Error> {
    sqlx::query_scalar(
        r#"
            SELECT COALESCE(SUM(sum), 0)::bigint AS total_withdrawn_kopeks
            FROM withdrawals
            WHERE user_id = $1;
        "#,
    )
    .bind(user_id)
    .fetch_one(conn)
    .await
}

/// One withdrawal attempt: a single serializable statement computes the balance and inserts the withdrawal iff the
/// balance covers the sum. Returns whether the insert happened. Serialization conflicts bubble up as errors; the
/// caller retries them.
pub async fn withdraw_points(
    pool: &PgPool,
    user_id: i64,
    order_number: &str,
    sum: Kopek,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE").execute(&mut *tx).await?;
    let inserted: bool = sqlx::query_scalar(
        r#"
            WITH bal AS (
                SELECT (
                    COALESCE((
                        SELECT SUM(o.accrual) FROM orders o
                        WHERE o.user_id = $1 AND o.status = 'PROCESSED'
                    ), 0)
                    -
                    COALESCE((
                        SELECT SUM(w.sum) FROM withdrawals w
                        WHERE w.user_id = $1
                    ), 0)
                )::bigint AS balance
            ),
            ins AS (
                INSERT INTO withdrawals (user_id, order_number, sum)
                SELECT $1, $2, $3::bigint
                FROM bal
                WHERE bal.balance >= $3::bigint
                RETURNING id
            )
            SELECT EXISTS(SELECT 1 FROM ins) AS ok;
        "#,
    )
    .bind(user_id)
    .bind(order_number)
    .bind(sum)
    .fetch_one(&mut *tx)
    .await?;
    if inserted {
        tx.commit().await?;
    } else {
        tx.rollback().await?;
    }
    trace!("🗃️ Withdrawal of {sum} for user {user_id}: inserted = {inserted}");
    Ok(inserted)
}
