use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum HealthCheckError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for HealthCheckError {
    fn from(e: sqlx::Error) -> Self {
        HealthCheckError::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait HealthCheck {
    /// Verifies the backend is reachable, retrying transient connectivity failures.
    async fn ping(&self) -> Result<(), HealthCheckError>;
}
