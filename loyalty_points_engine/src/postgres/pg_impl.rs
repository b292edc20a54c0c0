use std::fmt::Debug;

use log::*;
use lpg_common::Kopek;
use sqlx::PgPool;

use crate::{
    db_types::{NewOrder, NewUser, Order, OrderStatus, User, Withdrawal},
    helpers::retry::Retrier,
    postgres::{
        db,
        errors::{is_serialization_failure, is_transient, is_unique_violation},
        new_pool,
        PgDatabaseError,
    },
    traits::{
        AuthApiError,
        BalanceApiError,
        BalanceManagement,
        CollectorApiError,
        CollectorDatabase,
        HealthCheck,
        HealthCheckError,
        InsertOrderResult,
        OrderApiError,
        OrderManagement,
        UserManagement,
        WithdrawalApiError,
        WithdrawalManagement,
    },
};

#[derive(Clone)]
pub struct PostgresDatabase {
    url: String,
    pool: PgPool,
}

impl Debug for PostgresDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "PostgresDatabase ({:?})", self.pool)
    }
}

impl PostgresDatabase {
    /// Connects to the database and brings the schema up to date. A migration failure is fatal to startup.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, PgDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("🗃️ Database is reachable and the schema is up to date");
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl UserManagement for PostgresDatabase {
    async fn create_user(&self, user: NewUser) -> Result<User, AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        match db::users::create_user(&user, &mut conn).await {
            Ok(user) => Ok(user),
            Err(e) if is_unique_violation(&e) => Err(AuthApiError::UserExists),
            Err(e) => Err(e.into()),
        }
    }

    async fn fetch_user_by_login(&self, login: &str) -> Result<Option<User>, AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(db::users::fetch_user_by_login(login, &mut conn).await?)
    }
}

impl OrderManagement for PostgresDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(db::orders::insert_order(&order, &mut conn).await?)
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(db::orders::fetch_orders_for_user(user_id, &mut conn).await?)
    }
}

impl BalanceManagement for PostgresDatabase {
    async fn fetch_balance(&self, user_id: i64) -> Result<Kopek, BalanceApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(db::balance::fetch_balance(user_id, &mut conn).await?)
    }

    async fn fetch_withdrawals_sum(&self, user_id: i64) -> Result<Kopek, BalanceApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(db::balance::fetch_withdrawals_sum(user_id, &mut conn).await?)
    }

    async fn withdraw_points(&self, user_id: i64, order_number: &str, sum: Kopek) -> Result<(), BalanceApiError> {
        let retrier = Retrier::default();
        let inserted = retrier
            .run(|| db::balance::withdraw_points(&self.pool, user_id, order_number, sum), is_serialization_failure)
            .await?;
        if inserted {
            Ok(())
        } else {
            Err(BalanceApiError::InsufficientPoints)
        }
    }
}

impl WithdrawalManagement for PostgresDatabase {
    async fn fetch_withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, WithdrawalApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(db::withdrawals::fetch_withdrawals_for_user(user_id, &mut conn).await?)
    }
}

impl CollectorDatabase for PostgresDatabase {
    async fn fetch_orders_batch(&self, batch_size: i64) -> Result<Vec<Order>, CollectorApiError> {
        Ok(db::collector::fetch_orders_batch(&self.pool, batch_size).await?)
    }

    async fn set_accrual(&self, order_id: i64, sum: Kopek) -> Result<(), CollectorApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(db::collector::set_accrual(order_id, sum, &mut conn).await?)
    }

    async fn set_status(&self, order_id: i64, status: OrderStatus) -> Result<(), CollectorApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(db::collector::set_status(order_id, status, &mut conn).await?)
    }
}

impl HealthCheck for PostgresDatabase {
    async fn ping(&self) -> Result<(), HealthCheckError> {
        let retrier = Retrier::default();
        retrier
            .run(|| async { sqlx::query("SELECT 1").execute(&self.pool).await.map(|_| ()) }, is_transient)
            .await?;
        Ok(())
    }
}
