use chrono::{DateTime, Utc};
use loyalty_points_engine::db_types::{Balance, Order, OrderStatus, Withdrawal};
use lpg_common::Kopek;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub number: String,
    pub status: OrderStatus,
    pub accrual: Kopek,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self { number: order.number, status: order.status, accrual: order.accrual, uploaded_at: order.uploaded_at }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceResponse {
    pub current: Kopek,
    pub withdrawn: Kopek,
}

impl From<Balance> for BalanceResponse {
    fn from(balance: Balance) -> Self {
        Self { current: balance.current, withdrawn: balance.withdrawn }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WithdrawRequest {
    pub order: String,
    pub sum: Kopek,
}

#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalResponse {
    pub order: String,
    pub sum: Kopek,
    pub processed_at: DateTime<Utc>,
}

impl From<Withdrawal> for WithdrawalResponse {
    fn from(withdrawal: Withdrawal) -> Self {
        Self { order: withdrawal.order_number, sum: withdrawal.sum, processed_at: withdrawal.processed_at }
    }
}
