use lpg_common::Kopek;
use loyalty_points_engine::{
    db_types::{NewOrder, NewUser, Order, User, Withdrawal},
    traits::{
        AuthApiError,
        BalanceApiError,
        BalanceManagement,
        InsertOrderResult,
        OrderApiError,
        OrderManagement,
        UserManagement,
        WithdrawalApiError,
        WithdrawalManagement,
    },
};
use mockall::mock;

mock! {
    pub UserManager {}
    impl UserManagement for UserManager {
        async fn create_user(&self, user: NewUser) -> Result<User, AuthApiError>;
        async fn fetch_user_by_login(&self, login: &str) -> Result<Option<User>, AuthApiError>;
    }
}

mock! {
    pub OrderManager {}
    impl OrderManagement for OrderManager {
        async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, OrderApiError>;
        async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderApiError>;
    }
}

mock! {
    pub BalanceManager {}
    impl BalanceManagement for BalanceManager {
        async fn fetch_balance(&self, user_id: i64) -> Result<Kopek, BalanceApiError>;
        async fn fetch_withdrawals_sum(&self, user_id: i64) -> Result<Kopek, BalanceApiError>;
        async fn withdraw_points(&self, user_id: i64, order_number: &str, sum: Kopek) -> Result<(), BalanceApiError>;
    }
}

mock! {
    pub WithdrawalManager {}
    impl WithdrawalManagement for WithdrawalManager {
        async fn fetch_withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, WithdrawalApiError>;
    }
}
