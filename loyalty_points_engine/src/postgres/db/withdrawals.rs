use sqlx::PgConnection;

use crate::db_types::Withdrawal;

/// Fetches the withdrawals of the given user, newest first.
pub async fn fetch_withdrawals_for_user(
    user_id: i64,
    conn: &mut PgConnection,
) -> Result<Vec<Withdrawal>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT id, user_id, order_number, sum, processed_at
            FROM withdrawals
            WHERE user_id = $1
            ORDER BY id DESC;
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
}
