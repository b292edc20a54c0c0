use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{Days, Utc};
use loyalty_points_engine::{traits::BalanceApiError, BalanceApi};
use lpg_common::Kopek;
use mockall::predicate::eq;

use super::{
    helpers::{get_request, issue_token, post_request},
    mocks::MockBalanceManager,
};
use crate::routes;

fn balance_routes(cfg: &mut ServiceConfig, balance: MockBalanceManager) {
    cfg.service(web::resource("/api/user/balance").route(web::get().to(routes::get_balance::<MockBalanceManager>)))
        .service(
            web::resource("/api/user/balance/withdraw")
                .route(web::post().to(routes::withdraw::<MockBalanceManager>)),
        )
        .app_data(web::Data::new(BalanceApi::new(balance)));
}

fn valid_token() -> String {
    issue_token(1, Utc::now() + Days::new(1))
}

#[actix_web::test]
async fn balance_reports_current_and_withdrawn() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        let mut balance = MockBalanceManager::new();
        balance.expect_fetch_balance().with(eq(1i64)).returning(|_| Ok(Kopek::from(49700)));
        balance.expect_fetch_withdrawals_sum().with(eq(1i64)).returning(|_| Ok(Kopek::from(300)));
        balance_routes(cfg, balance);
    }
    let (status, body) = get_request(&valid_token(), "/api/user/balance", configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"current":497,"withdrawn":3}"#);
}

#[actix_web::test]
async fn fractional_balances_keep_their_kopeks() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        let mut balance = MockBalanceManager::new();
        balance.expect_fetch_balance().returning(|_| Ok(Kopek::from(50050)));
        balance.expect_fetch_withdrawals_sum().returning(|_| Ok(Kopek::from(5)));
        balance_routes(cfg, balance);
    }
    let (status, body) = get_request(&valid_token(), "/api/user/balance", configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"current":500.5,"withdrawn":0.05}"#);
}

#[actix_web::test]
async fn withdrawal_succeeds() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        let mut balance = MockBalanceManager::new();
        balance
            .expect_withdraw_points()
            .withf(|user_id, order_number, sum| {
                *user_id == 1 && order_number == "2377225624" && *sum == Kopek::from(300)
            })
            .once()
            .returning(|_, _, _| Ok(()));
        balance_routes(cfg, balance);
    }
    let (status, _) = post_request(
        &valid_token(),
        "/api/user/balance/withdraw",
        "application/json",
        r#"{"order":"2377225624","sum":3}"#,
        configure,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn string_sums_are_accepted_on_the_wire() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        let mut balance = MockBalanceManager::new();
        balance
            .expect_withdraw_points()
            .withf(|_, _, sum| *sum == Kopek::from(300))
            .once()
            .returning(|_, _, _| Ok(()));
        balance_routes(cfg, balance);
    }
    let (status, _) = post_request(
        &valid_token(),
        "/api/user/balance/withdraw",
        "application/json",
        r#"{"order":"2377225624","sum":"3"}"#,
        configure,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn insufficient_points_require_payment() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        let mut balance = MockBalanceManager::new();
        balance.expect_withdraw_points().returning(|_, _, _| Err(BalanceApiError::InsufficientPoints));
        balance_routes(cfg, balance);
    }
    let (status, body) = post_request(
        &valid_token(),
        "/api/user/balance/withdraw",
        "application/json",
        r#"{"order":"2377225624","sum":"100"}"#,
        configure,
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body, "insufficient points");
}

#[actix_web::test]
async fn zero_sum_fails_validation() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        balance_routes(cfg, MockBalanceManager::new());
    }
    let (status, _) = post_request(
        &valid_token(),
        "/api/user/balance/withdraw",
        "application/json",
        r#"{"order":"2377225624","sum":0}"#,
        configure,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn bad_payment_reference_fails_validation() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        balance_routes(cfg, MockBalanceManager::new());
    }
    let (status, _) = post_request(
        &valid_token(),
        "/api/user/balance/withdraw",
        "application/json",
        r#"{"order":"123123","sum":3}"#,
        configure,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn empty_payment_reference_is_bad_request() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        balance_routes(cfg, MockBalanceManager::new());
    }
    let (status, _) = post_request(
        &valid_token(),
        "/api/user/balance/withdraw",
        "application/json",
        r#"{"order":"  ","sum":3}"#,
        configure,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
