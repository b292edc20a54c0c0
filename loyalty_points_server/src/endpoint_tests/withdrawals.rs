use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{Days, TimeZone, Utc};
use loyalty_points_engine::{db_types::Withdrawal, WithdrawalApi};
use lpg_common::Kopek;

use super::{
    helpers::{get_request, issue_token},
    mocks::MockWithdrawalManager,
};
use crate::routes;

fn withdrawal_routes(cfg: &mut ServiceConfig, withdrawals: MockWithdrawalManager) {
    cfg.service(
        web::resource("/api/user/withdrawals")
            .route(web::get().to(routes::list_withdrawals::<MockWithdrawalManager>)),
    )
    .app_data(web::Data::new(WithdrawalApi::new(withdrawals)));
}

fn valid_token() -> String {
    issue_token(1, Utc::now() + Days::new(1))
}

#[actix_web::test]
async fn withdrawal_history_is_rendered_newest_first() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        let mut withdrawals = MockWithdrawalManager::new();
        withdrawals.expect_fetch_withdrawals_for_user().returning(|_| {
            Ok(vec![
                Withdrawal {
                    id: 2,
                    user_id: 1,
                    order_number: "2377225624".to_string(),
                    sum: Kopek::from(300),
                    processed_at: Utc.with_ymd_and_hms(2024, 3, 16, 11, 20, 0).unwrap(),
                },
                Withdrawal {
                    id: 1,
                    user_id: 1,
                    order_number: "12345678903".to_string(),
                    sum: Kopek::from(10050),
                    processed_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
                },
            ])
        });
        withdrawal_routes(cfg, withdrawals);
    }
    let (status, body) = get_request(&valid_token(), "/api/user/withdrawals", configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, WITHDRAWALS_JSON);
}

#[actix_web::test]
async fn empty_withdrawal_history_is_no_content() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        let mut withdrawals = MockWithdrawalManager::new();
        withdrawals.expect_fetch_withdrawals_for_user().returning(|_| Ok(vec![]));
        withdrawal_routes(cfg, withdrawals);
    }
    let (status, body) = get_request(&valid_token(), "/api/user/withdrawals", configure).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}

const WITHDRAWALS_JSON: &str = r#"[{"order":"2377225624","sum":3,"processed_at":"2024-03-16T11:20:00Z"},{"order":"12345678903","sum":100.5,"processed_at":"2024-03-01T10:00:00Z"}]"#;
