use log::trace;
use lpg_common::Kopek;
use sqlx::{PgConnection, PgPool};

use crate::db_types::{Order, OrderStatus};

/// Claims up to `batch_size` non-terminal orders for one polling round.
///
/// The ids are selected least-recently-polled first and locked `FOR UPDATE SKIP LOCKED`, so a concurrent claimer
/// skips them instead of blocking. A second statement stamps `last_polled_at` and returns the full rows; the commit
/// releases the locks and closes the batch.
pub async fn fetch_orders_batch(pool: &PgPool, batch_size: i64) -> Result<Vec<Order>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let ids: Vec<i64> = sqlx::query_scalar(
        r#"
            SELECT id FROM orders
            WHERE status IN ('NEW', 'PROCESSING')
            ORDER BY last_polled_at NULLS FIRST, id
            LIMIT $1
            FOR UPDATE SKIP LOCKED;
        "#,
    )
    .bind(batch_size)
    .fetch_all(&mut *tx)
    .await?;
    if ids.is_empty() {
        tx.commit().await?;
        return Ok(Vec::new());
    }
    let orders: Vec<Order> = sqlx::query_as(
        r#"
            UPDATE orders AS o
            SET last_polled_at = NOW()
            WHERE o.id = ANY($1)
            RETURNING o.id, o.user_id, o.number, o.status, o.accrual, o.uploaded_at, o.last_polled_at;
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *tx)
    .await?;
    tx.commit().await?;
    trace!("🗃️ Claimed a poll batch of {} orders", orders.len());
    Ok(orders)
}

/// Records the awarded points and marks the order PROCESSED.
pub async fn set_accrual(order_id: i64, sum: Kopek, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            UPDATE orders
            SET accrual = $1,
                status = $2
            WHERE id = $3;
        "#,
    )
    .bind(sum)
    .bind(OrderStatus::Processed.to_string())
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn set_status(order_id: i64, status: OrderStatus, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            UPDATE orders
            SET status = $1
            WHERE id = $2;
        "#,
    )
    .bind(status.to_string())
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(())
}
