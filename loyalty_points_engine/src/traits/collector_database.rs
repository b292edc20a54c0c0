use lpg_common::Kopek;
use thiserror::Error;

use crate::db_types::{Order, OrderStatus};

#[derive(Debug, Clone, Error)]
pub enum CollectorApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for CollectorApiError {
    fn from(e: sqlx::Error) -> Self {
        CollectorApiError::DatabaseError(e.to_string())
    }
}

/// The `CollectorDatabase` trait is the storage side of the accrual poller. There is no persisted job queue: the
/// poller derives its work from the orders table itself.
#[allow(async_fn_in_trait)]
pub trait CollectorDatabase {
    /// Claims up to `batch_size` orders in non-terminal states, least-recently-polled first, stamps their
    /// `last_polled_at` and returns the full rows. The claim is taken `FOR UPDATE SKIP LOCKED`, so two concurrent
    /// pollers never see the same id while the claiming transaction is open.
    async fn fetch_orders_batch(&self, batch_size: i64) -> Result<Vec<Order>, CollectorApiError>;

    /// Records the awarded points and marks the order PROCESSED.
    async fn set_accrual(&self, order_id: i64, sum: Kopek) -> Result<(), CollectorApiError>;

    /// Updates only the order status.
    async fn set_status(&self, order_id: i64, status: OrderStatus) -> Result<(), CollectorApiError>;
}
