use thiserror::Error;

use crate::db_types::{NewOrder, Order};

/// Outcome of an order insert. The unique index on the order number decides the winner; losers learn who owns the
/// existing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOrderResult {
    Inserted(i64),
    AlreadyExistsForUser,
    AlreadyExistsForOtherUser,
}

#[derive(Debug, Clone, Error)]
pub enum OrderApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The order number is empty")]
    EmptyOrderNumber,
    #[error("The order number fails the checksum")]
    InvalidOrderNumber,
}

impl From<sqlx::Error> for OrderApiError {
    fn from(e: sqlx::Error) -> Self {
        OrderApiError::DatabaseError(e.to_string())
    }
}

/// The `OrderManagement` trait defines behaviour for storing submitted orders and listing them per user.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Inserts a new order. On a number collision the existing owner is looked up so the caller can distinguish an
    /// idempotent resubmission from a conflict with another user.
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, OrderApiError>;

    /// Fetches all orders of the given user, newest first.
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderApiError>;
}
