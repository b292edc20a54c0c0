//! # Loyalty points engine public API
//!
//! The `lpe_api` module exposes the programmatic API for the loyalty points engine. The API is modular, so that
//! clients can pick and choose the functionality they want.
//!
//! * [`auth_api`] registers users and verifies login credentials.
//! * [`order_api`] validates and submits order numbers and lists a user's orders.
//! * [`balance_api`] derives balances and executes the atomic withdrawal flow.
//! * [`withdrawal_api`] lists a user's withdrawal history.
//! * [`health_api`] verifies backend liveness.
//!
//! # API usage
//!
//! The pattern for using all the APIs is the same. An API instance is created by supplying a database backend that
//! implements the specific backend traits required by the API.
//!
//! ```rust,ignore
//! use loyalty_points_engine::{OrderApi, PostgresDatabase};
//! let db = PostgresDatabase::new_with_url(url, 25).await?;
//! // PostgresDatabase implements OrderManagement
//! let api = OrderApi::new(db);
//! let result = api.submit_order(user_id, "79927398713").await?;
//! ```

pub mod auth_api;
pub mod balance_api;
pub mod health_api;
pub mod order_api;
pub mod withdrawal_api;
