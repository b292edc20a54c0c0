use thiserror::Error;

#[derive(Debug, Error)]
pub enum PgDatabaseError {
    #[error("Database error: {0}")]
    Query(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// The insert hit a unique index (duplicate login, order number or withdrawal reference).
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// SQLSTATE 40001 (serialization_failure) or 40P01 (deadlock_detected): the serializable transaction lost a race and
/// is safe to retry.
pub fn is_serialization_failure(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => matches!(db.code().as_deref(), Some("40001") | Some("40P01")),
        _ => false,
    }
}

/// Connectivity-class failures worth retrying: pool/IO breakage, SQLSTATE class 08 (connection exception) and class
/// 57 (operator intervention).
pub fn is_transient(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => true,
        sqlx::Error::Database(db) => {
            db.code().map(|code| code.starts_with("08") || code.starts_with("57")).unwrap_or(false)
        },
        _ => false,
    }
}
