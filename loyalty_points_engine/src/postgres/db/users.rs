use sqlx::PgConnection;

use crate::db_types::{NewUser, User};

pub async fn create_user(user: &NewUser, conn: &mut PgConnection) -> Result<User, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO users (login, password_hash)
            VALUES ($1, $2)
            RETURNING id;
        "#,
    )
    .bind(&user.login)
    .bind(&user.password_hash)
    .fetch_one(conn)
    .await?;
    Ok(User { id, login: user.login.clone(), password_hash: user.password_hash.clone() })
}

pub async fn fetch_user_by_login(login: &str, conn: &mut PgConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT id, login, password_hash
            FROM users
            WHERE login = $1;
        "#,
    )
    .bind(login)
    .fetch_optional(conn)
    .await
}
