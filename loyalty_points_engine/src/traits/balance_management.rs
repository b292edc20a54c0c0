use lpg_common::Kopek;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum BalanceApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Insufficient points to complete the withdrawal")]
    InsufficientPoints,
    #[error("The order number is empty")]
    EmptyOrderNumber,
    #[error("The order number fails the checksum")]
    InvalidOrderNumber,
    #[error("The withdrawal sum must be positive")]
    NonPositiveSum,
}

impl From<sqlx::Error> for BalanceApiError {
    fn from(e: sqlx::Error) -> Self {
        BalanceApiError::DatabaseError(e.to_string())
    }
}

/// The `BalanceManagement` trait defines behaviour for deriving balances and spending points.
///
/// A balance is never stored: it is the sum of accruals over PROCESSED orders minus the sum of withdrawals. The
/// conditional insert in [`withdraw_points`](BalanceManagement::withdraw_points) is the only place non-negativity is
/// enforced, and it must be atomic with respect to the balance computation.
#[allow(async_fn_in_trait)]
pub trait BalanceManagement {
    /// Computes the user's current balance (accruals minus withdrawals), with missing sums coalesced to zero.
    async fn fetch_balance(&self, user_id: i64) -> Result<Kopek, BalanceApiError>;

    /// Computes the lifetime sum the user has withdrawn.
    async fn fetch_withdrawals_sum(&self, user_id: i64) -> Result<Kopek, BalanceApiError>;

    /// Atomically inserts a withdrawal iff the balance covers `sum`, at serializable isolation, retrying
    /// serialization conflicts. Returns [`BalanceApiError::InsufficientPoints`] when the balance does not cover the
    /// sum.
    async fn withdraw_points(&self, user_id: i64, order_number: &str, sum: Kopek) -> Result<(), BalanceApiError>;
}
