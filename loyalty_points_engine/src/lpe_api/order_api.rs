use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewOrder, Order},
    helpers::luhn,
    traits::{InsertOrderResult, OrderApiError, OrderManagement},
};

/// The `OrderApi` handles order submission and listing.
///
/// Submission is idempotent for the owner: resubmitting a number you already own is reported as
/// [`InsertOrderResult::AlreadyExistsForUser`] rather than an error, while a number owned by someone else is a
/// conflict.
pub struct OrderApi<B> {
    db: B,
}

impl<B> Debug for OrderApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderApi")
    }
}

impl<B> OrderApi<B>
where B: OrderManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Validates and stores a newly submitted order number. The number is trimmed, must be non-empty and must pass
    /// the Luhn checksum. New orders start in the NEW state and are picked up by the accrual poller from there.
    pub async fn submit_order(&self, user_id: i64, number: &str) -> Result<InsertOrderResult, OrderApiError> {
        let number = number.trim();
        if number.is_empty() {
            return Err(OrderApiError::EmptyOrderNumber);
        }
        if !luhn::validate_number(number) {
            debug!("🛒️ Order number {number} fails the checksum");
            return Err(OrderApiError::InvalidOrderNumber);
        }
        let result = self.db.insert_order(NewOrder::new(user_id, number.to_string())).await?;
        match &result {
            InsertOrderResult::Inserted(id) => debug!("🛒️ Order {number} saved with id {id}"),
            InsertOrderResult::AlreadyExistsForUser => debug!("🛒️ Order {number} was already submitted by its owner"),
            InsertOrderResult::AlreadyExistsForOtherUser => {
                debug!("🛒️ Order {number} was already submitted by another user")
            },
        }
        Ok(result)
    }

    /// Fetches all orders of the given user, newest first.
    pub async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderApiError> {
        self.db.fetch_orders_for_user(user_id).await
    }
}
