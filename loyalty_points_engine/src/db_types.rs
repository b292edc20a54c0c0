use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use lpg_common::Kopek;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

//--------------------------------------        User         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub password_hash: String,
}

//--------------------------------------       NewUser       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewUser {
    pub login: String,
    /// PHC-format hash, never the cleartext password
    pub password_hash: String,
}

impl NewUser {
    pub fn new(login: String, password_hash: String) -> Self {
        Self { login, password_hash }
    }
}

//--------------------------------------     OrderStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// The order has been submitted and has not been polled yet.
    New,
    /// The accrual service knows about the order and is still evaluating it.
    Processing,
    /// The accrual service has awarded points for the order. Terminal.
    Processed,
    /// The accrual service rejected the order. Terminal.
    Invalid,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Processed | OrderStatus::Invalid)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::New => write!(f, "NEW"),
            OrderStatus::Processing => write!(f, "PROCESSING"),
            OrderStatus::Processed => write!(f, "PROCESSED"),
            OrderStatus::Invalid => write!(f, "INVALID"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct OrderStatusConversionError(String);

impl FromStr for OrderStatus {
    type Err = OrderStatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "PROCESSING" => Ok(Self::Processing),
            "PROCESSED" => Ok(Self::Processed),
            "INVALID" => Ok(Self::Invalid),
            s => Err(OrderStatusConversionError(s.to_string())),
        }
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = OrderStatusConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    /// The Luhn-valid order number, unique across all users
    pub number: String,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub accrual: Kopek,
    pub uploaded_at: DateTime<Utc>,
    pub last_polled_at: Option<DateTime<Utc>>,
}

//--------------------------------------      NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i64,
    pub number: String,
    pub status: OrderStatus,
}

impl NewOrder {
    pub fn new(user_id: i64, number: String) -> Self {
        Self { user_id, number, status: OrderStatus::New }
    }
}

//--------------------------------------     Withdrawal      ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct Withdrawal {
    pub id: i64,
    pub user_id: i64,
    /// User-supplied payment reference. Not required to match a submitted order.
    pub order_number: String,
    pub sum: Kopek,
    pub processed_at: DateTime<Utc>,
}

//--------------------------------------       Balance       ---------------------------------------------------------
/// A user's spendable points next to the lifetime total they have withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    pub current: Kopek,
    pub withdrawn: Kopek,
}

#[cfg(test)]
mod test {
    use super::OrderStatus;

    #[test]
    fn status_text_round_trips() {
        for status in [OrderStatus::New, OrderStatus::Processing, OrderStatus::Processed, OrderStatus::Invalid] {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("REGISTERED".parse::<OrderStatus>().is_err());
        assert!("new".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn only_processed_and_invalid_are_terminal() {
        assert!(!OrderStatus::New.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
        assert!(OrderStatus::Processed.is_terminal());
        assert!(OrderStatus::Invalid.is_terminal());
    }

    #[test]
    fn status_serializes_as_upper_case_text() {
        assert_eq!(serde_json::to_string(&OrderStatus::Processed).unwrap(), "\"PROCESSED\"");
        assert_eq!(serde_json::from_str::<OrderStatus>("\"NEW\"").unwrap(), OrderStatus::New);
    }
}
