use std::fmt::Debug;

use crate::{
    db_types::Withdrawal,
    traits::{WithdrawalApiError, WithdrawalManagement},
};

/// The `WithdrawalApi` lists a user's withdrawal history.
pub struct WithdrawalApi<B> {
    db: B,
}

impl<B> Debug for WithdrawalApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WithdrawalApi")
    }
}

impl<B> WithdrawalApi<B>
where B: WithdrawalManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, WithdrawalApiError> {
        self.db.fetch_withdrawals_for_user(user_id).await
    }
}
