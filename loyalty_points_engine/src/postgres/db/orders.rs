use log::debug;
use sqlx::PgConnection;

use crate::{
    db_types::{NewOrder, Order},
    postgres::errors::is_unique_violation,
    traits::InsertOrderResult,
};

/// Inserts a new order. On a unique violation of the number index the existing owner is looked up so the caller can
/// tell an idempotent resubmission apart from a conflict with another user.
pub async fn insert_order(order: &NewOrder, conn: &mut PgConnection) -> Result<InsertOrderResult, sqlx::Error> {
    let inserted: Result<i64, sqlx::Error> = sqlx::query_scalar(
        r#"
            INSERT INTO orders (user_id, number, status)
            VALUES ($1, $2, $3)
            RETURNING id;
        "#,
    )
    .bind(order.user_id)
    .bind(&order.number)
    .bind(order.status.to_string())
    .fetch_one(&mut *conn)
    .await;
    match inserted {
        Ok(id) => Ok(InsertOrderResult::Inserted(id)),
        Err(e) if is_unique_violation(&e) => {
            let owner_id: i64 = sqlx::query_scalar("SELECT user_id FROM orders WHERE number = $1")
                .bind(&order.number)
                .fetch_one(conn)
                .await?;
            debug!("🗃️ Order {} already exists and belongs to user {owner_id}", order.number);
            if owner_id == order.user_id {
                Ok(InsertOrderResult::AlreadyExistsForUser)
            } else {
                Ok(InsertOrderResult::AlreadyExistsForOtherUser)
            }
        },
        Err(e) => Err(e),
    }
}

/// Fetches the orders of the given user, newest first.
pub async fn fetch_orders_for_user(user_id: i64, conn: &mut PgConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT id, user_id, number, status, accrual, uploaded_at, last_polled_at
            FROM orders
            WHERE user_id = $1
            ORDER BY id DESC;
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
}
