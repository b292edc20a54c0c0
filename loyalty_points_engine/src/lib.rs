//! Loyalty Points Engine
//!
//! The Loyalty Points Engine contains the core logic for the loyalty-points gateway. Users submit order numbers for
//! purchases made at the merchant, an external accrual service decides how many points each order earns, and users
//! spend their points as withdrawals against new order numbers.
//!
//! The library is divided into two main sections:
//! 1. Database management and control. Postgres is the supported backend. You should never need to access the
//!    database directly. Instead, use the public API provided by the engine. The exception is the data types used in
//!    the database. These are defined in the `db_types` module and are public.
//! 2. The service APIs in [`lpe_api`]: order submission, balance and withdrawal flow, registration and login. These
//!    own the validation rules (Luhn checks, password policy, positive sums) and delegate storage to the traits in
//!    [`traits`].

pub mod db_types;
pub mod helpers;
pub mod lpe_api;
pub mod postgres;
pub mod traits;

pub use lpe_api::{
    auth_api::AuthApi,
    balance_api::BalanceApi,
    health_api::HealthApi,
    order_api::OrderApi,
    withdrawal_api::WithdrawalApi,
};
pub use postgres::PostgresDatabase;
