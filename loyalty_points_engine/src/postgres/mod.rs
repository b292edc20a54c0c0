pub mod db;
mod errors;
mod pg_impl;

pub use errors::{is_serialization_failure, is_transient, is_unique_violation, PgDatabaseError};
use log::trace;
pub use pg_impl::PostgresDatabase;
use sqlx::{postgres::PgPoolOptions, Executor, PgPool};

pub async fn new_pool(url: &str, max_connections: u32) -> Result<PgPool, PgDatabaseError> {
    trace!("🗃️ Creating new database connection pool");
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                // timestamps are stored and compared in UTC
                conn.execute("SET TIME ZONE 'UTC'").await?;
                Ok(())
            })
        })
        .connect(url)
        .await?;
    Ok(pool)
}
