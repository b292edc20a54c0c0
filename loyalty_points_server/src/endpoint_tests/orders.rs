use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{Days, TimeZone, Utc};
use loyalty_points_engine::{
    db_types::{Order, OrderStatus},
    traits::InsertOrderResult,
    OrderApi,
};
use lpg_common::Kopek;

use super::{
    helpers::{get_request, issue_token, post_request},
    mocks::MockOrderManager,
};
use crate::routes;

fn order_routes(cfg: &mut ServiceConfig, orders: MockOrderManager) {
    cfg.service(
        web::resource("/api/user/orders")
            .route(web::get().to(routes::list_orders::<MockOrderManager>))
            .route(web::post().to(routes::submit_order::<MockOrderManager>)),
    )
    .app_data(web::Data::new(OrderApi::new(orders)));
}

fn valid_token() -> String {
    issue_token(1, Utc::now() + Days::new(1))
}

#[actix_web::test]
async fn submitting_a_new_order_is_accepted() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        let mut orders = MockOrderManager::new();
        orders
            .expect_insert_order()
            .withf(|order| order.user_id == 1 && order.number == "79927398713" && order.status == OrderStatus::New)
            .once()
            .returning(|_| Ok(InsertOrderResult::Inserted(1)));
        order_routes(cfg, orders);
    }
    let (status, _) = post_request(&valid_token(), "/api/user/orders", "text/plain", "79927398713", configure).await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[actix_web::test]
async fn resubmission_by_the_owner_is_ok() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        let mut orders = MockOrderManager::new();
        orders.expect_insert_order().returning(|_| Ok(InsertOrderResult::AlreadyExistsForUser));
        order_routes(cfg, orders);
    }
    let (status, _) = post_request(&valid_token(), "/api/user/orders", "text/plain", "79927398713", configure).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn submitting_another_users_order_conflicts() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        let mut orders = MockOrderManager::new();
        orders.expect_insert_order().returning(|_| Ok(InsertOrderResult::AlreadyExistsForOtherUser));
        order_routes(cfg, orders);
    }
    let (status, _) = post_request(&valid_token(), "/api/user/orders", "text/plain", "79927398713", configure).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn bad_checksum_is_unprocessable() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        // validation fails before any storage access
        order_routes(cfg, MockOrderManager::new());
    }
    let (status, _) = post_request(&valid_token(), "/api/user/orders", "text/plain", "123123", configure).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn blank_body_is_bad_request() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        order_routes(cfg, MockOrderManager::new());
    }
    let (status, _) = post_request(&valid_token(), "/api/user/orders", "text/plain", "  \n", configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn json_submission_is_unsupported() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        order_routes(cfg, MockOrderManager::new());
    }
    let (status, _) =
        post_request(&valid_token(), "/api/user/orders", "application/json", "79927398713", configure).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[actix_web::test]
async fn request_without_a_token_is_unauthorized() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        order_routes(cfg, MockOrderManager::new());
    }
    let (status, body) = get_request("", "/api/user/orders", configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "missing bearer token");
}

#[actix_web::test]
async fn request_with_a_tampered_token_is_unauthorized() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        order_routes(cfg, MockOrderManager::new());
    }
    let mut token = valid_token();
    let len = token.len();
    token.replace_range(len - 10..len - 5, "00000");
    let (status, body) = get_request(&token, "/api/user/orders", configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "token validation failed");
}

#[actix_web::test]
async fn order_list_renders_statuses_and_accruals() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        let mut orders = MockOrderManager::new();
        orders.expect_fetch_orders_for_user().returning(|_| {
            Ok(vec![
                Order {
                    id: 2,
                    user_id: 1,
                    number: "79927398713".to_string(),
                    status: OrderStatus::Processed,
                    accrual: Kopek::from(50000),
                    uploaded_at: Utc.with_ymd_and_hms(2024, 3, 15, 18, 30, 0).unwrap(),
                    last_polled_at: Some(Utc.with_ymd_and_hms(2024, 3, 15, 18, 31, 0).unwrap()),
                },
                Order {
                    id: 1,
                    user_id: 1,
                    number: "12345678903".to_string(),
                    status: OrderStatus::New,
                    accrual: Kopek::from(0),
                    uploaded_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
                    last_polled_at: None,
                },
            ])
        });
        order_routes(cfg, orders);
    }
    let (status, body) = get_request(&valid_token(), "/api/user/orders", configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ORDERS_JSON);
}

#[actix_web::test]
async fn empty_order_list_is_no_content() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        let mut orders = MockOrderManager::new();
        orders.expect_fetch_orders_for_user().returning(|_| Ok(vec![]));
        order_routes(cfg, orders);
    }
    let (status, body) = get_request(&valid_token(), "/api/user/orders", configure).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
}

const ORDERS_JSON: &str = r#"[{"number":"79927398713","status":"PROCESSED","accrual":500,"uploaded_at":"2024-03-15T18:30:00Z"},{"number":"12345678903","status":"NEW","accrual":0,"uploaded_at":"2024-02-29T13:30:00Z"}]"#;
