use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use loyalty_points_engine::{AuthApi, BalanceApi, HealthApi, OrderApi, PostgresDatabase, WithdrawalApi};
use lpg_common::Secret;
use tokio_util::sync::CancellationToken;

use crate::{
    auth::TokenIssuer,
    collector::Collector,
    config::ServerConfig,
    errors::ServerError,
    middleware::JwtAuthMiddlewareFactory,
    routes::configure_api,
};

const MAX_DB_CONNECTIONS: u32 = 25;
const MAX_JSON_PAYLOAD: usize = 1 << 20;
const SHUTDOWN_DRAIN_SECS: u64 = 5;

/// Brings up the database, the HTTP server and the accrual collector, and runs until shutdown.
///
/// The collector is supervised: if it dies with an error, the HTTP server is stopped and the error is surfaced so the
/// process exits non-zero. A regular shutdown (SIGTERM/SIGINT) drains in-flight requests and cancels the collector.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let database_uri = config
        .database_uri
        .clone()
        .ok_or_else(|| ServerError::ConfigurationError("the database URI is not set".to_string()))?;
    let accrual_address = config
        .accrual_address
        .clone()
        .ok_or_else(|| ServerError::ConfigurationError("the accrual system address is not set".to_string()))?;
    let jwt_secret = config
        .jwt_secret
        .clone()
        .ok_or_else(|| ServerError::ConfigurationError("the JWT secret is not set".to_string()))?;

    let db = PostgresDatabase::new_with_url(&database_uri, MAX_DB_CONNECTIONS)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;

    let collector = Collector::new(&accrual_address, config.poll_interval, db.clone())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;

    let srv = create_server_instance(&config, jwt_secret, db)?;
    let srv_handle = srv.handle();

    let shutdown = CancellationToken::new();
    let collector_failed = Arc::new(AtomicBool::new(false));
    let failed = Arc::clone(&collector_failed);
    let collector_token = shutdown.child_token();
    let supervisor = tokio::spawn(async move {
        info!("📡️ Starting accrual collector");
        if let Err(e) = collector.run(collector_token).await {
            error!("📡️ Accrual collector failed: {e}");
            failed.store(true, Ordering::SeqCst);
            srv_handle.stop(true).await;
        }
    });

    let result = srv.await;
    shutdown.cancel();
    let _ = supervisor.await;
    result?;
    if collector_failed.load(Ordering::SeqCst) {
        return Err(ServerError::CollectorFailed("see the collector log for details".to_string()));
    }
    Ok(())
}

pub fn create_server_instance(
    config: &ServerConfig,
    jwt_secret: Secret<String>,
    db: PostgresDatabase,
) -> Result<Server, ServerError> {
    let listen_address = config.listen_address();
    let jwt_ttl = config.jwt_ttl;
    let srv = HttpServer::new(move || {
        let auth_api = AuthApi::new(db.clone());
        let order_api = OrderApi::new(db.clone());
        let balance_api = BalanceApi::new(db.clone());
        let withdrawal_api = WithdrawalApi::new(db.clone());
        let health_api = HealthApi::new(db.clone());
        let signer = TokenIssuer::new(jwt_secret.clone(), jwt_ttl);
        let jwt = JwtAuthMiddlewareFactory::new(jwt_secret.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U"))
            .app_data(web::JsonConfig::default().limit(MAX_JSON_PAYLOAD))
            .app_data(web::Data::new(auth_api))
            .app_data(web::Data::new(order_api))
            .app_data(web::Data::new(balance_api))
            .app_data(web::Data::new(withdrawal_api))
            .app_data(web::Data::new(health_api))
            .app_data(web::Data::new(signer))
            .configure(configure_api::<PostgresDatabase>(jwt))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .shutdown_timeout(SHUTDOWN_DRAIN_SECS)
    .bind(listen_address.as_str())?
    .run();
    Ok(srv)
}
