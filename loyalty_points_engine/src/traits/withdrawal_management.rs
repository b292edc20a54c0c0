use thiserror::Error;

use crate::db_types::Withdrawal;

#[derive(Debug, Clone, Error)]
pub enum WithdrawalApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for WithdrawalApiError {
    fn from(e: sqlx::Error) -> Self {
        WithdrawalApiError::DatabaseError(e.to_string())
    }
}

/// The `WithdrawalManagement` trait lists a user's withdrawal history. Withdrawals are immutable once inserted.
#[allow(async_fn_in_trait)]
pub trait WithdrawalManagement {
    /// Fetches all withdrawals of the given user, newest first.
    async fn fetch_withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, WithdrawalApiError>;
}
