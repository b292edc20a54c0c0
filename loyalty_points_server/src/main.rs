use clap::Parser;
use dotenvy::dotenv;
use log::{error, info};
use loyalty_points_server::{config::ServerConfig, server::run_server};

#[actix_web::main]
async fn main() {
    dotenv().ok();
    let config = ServerConfig::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level.as_str())).init();
    if !preflight_check(&config) {
        eprintln!("🚀️ Preflight check failed. Exiting. Check the logs for details.");
        std::process::exit(1);
    }

    info!("🚀️ Starting server on {}", config.listen_address());
    match run_server(config).await {
        Ok(_) => println!("Bye!"),
        Err(e) => {
            error!("🚀️ {e}");
            std::process::exit(1);
        },
    }
}

fn preflight_check(config: &ServerConfig) -> bool {
    let mut result = true;
    info!("🚦️ Running preflight checks...");
    if config.database_uri.is_none() {
        error!("🚦️ DATABASE_URI is not set. Pass -d or set the environment variable to the Postgres DSN.");
        result = false;
    }
    if config.accrual_address.is_none() {
        error!("🚦️ ACCRUAL_SYSTEM_ADDRESS is not set. Pass -r or set the environment variable to the accrual base URL.");
        result = false;
    }
    if config.jwt_secret.is_none() {
        error!("🚦️ JWT_SECRET is not set. Pass --jwt-secret or set the environment variable to the signing key.");
        result = false;
    }
    if result {
        info!("🚦️ Preflight check PASSED.");
    } else {
        error!("🚦️ Preflight check FAILED: Please fix the issues above before starting the server.");
    }
    result
}
