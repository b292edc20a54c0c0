use std::fmt::Debug;

use log::*;
use lpg_common::Kopek;

use crate::{
    db_types::Balance,
    helpers::luhn,
    traits::{BalanceApiError, BalanceManagement},
};

/// The `BalanceApi` derives a user's balance and spends points.
///
/// The withdrawal path validates its inputs and then hands off to the backend's atomic conditional insert. There is
/// deliberately no check-then-insert sequence here: the non-negativity guarantee lives in the single serializable
/// statement behind [`BalanceManagement::withdraw_points`].
pub struct BalanceApi<B> {
    db: B,
}

impl<B> Debug for BalanceApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BalanceApi")
    }
}

impl<B> BalanceApi<B>
where B: BalanceManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Returns the user's current balance next to the lifetime total withdrawn.
    pub async fn balance_for_user(&self, user_id: i64) -> Result<Balance, BalanceApiError> {
        let current = self.db.fetch_balance(user_id).await?;
        let withdrawn = self.db.fetch_withdrawals_sum(user_id).await?;
        Ok(Balance { current, withdrawn })
    }

    /// Spends `sum` points against the given order number.
    ///
    /// The number is a payment reference supplied by the user; it must pass the Luhn checksum but is not required to
    /// match a submitted order. Surfaces [`BalanceApiError::InsufficientPoints`] verbatim from the backend.
    pub async fn withdraw(&self, user_id: i64, order_number: &str, sum: Kopek) -> Result<(), BalanceApiError> {
        let order_number = order_number.trim();
        if order_number.is_empty() {
            return Err(BalanceApiError::EmptyOrderNumber);
        }
        if !luhn::validate_number(order_number) {
            return Err(BalanceApiError::InvalidOrderNumber);
        }
        if !sum.is_positive() {
            return Err(BalanceApiError::NonPositiveSum);
        }
        self.db.withdraw_points(user_id, order_number, sum).await?;
        info!("💸️ User {user_id} withdrew {sum} against order {order_number}");
        Ok(())
    }
}
