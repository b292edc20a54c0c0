use std::time::Duration;

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::ServiceResponse,
    http::{header, StatusCode},
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use lpg_common::Secret;

use crate::{
    auth::{JwtClaims, TokenIssuer},
    middleware::JwtAuthMiddlewareFactory,
};

// Signing key for issuing test tokens. DO NOT re-use this key anywhere.
pub const TEST_JWT_SECRET: &str = "unit-test-signing-key-do-not-reuse";

pub fn test_secret() -> Secret<String> {
    Secret::new(TEST_JWT_SECRET.to_string())
}

pub fn test_issuer() -> TokenIssuer {
    TokenIssuer::new(test_secret(), Duration::from_secs(3600))
}

pub fn issue_token(user_id: i64, expiry: DateTime<Utc>) -> String {
    let claims = JwtClaims { user_id, exp: expiry.timestamp() };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()))
        .expect("Failed to sign token")
}

/// GET against an app wrapped with the bearer-token middleware. An empty `token` sends no Authorization header.
pub async fn get_request(token: &str, path: &str, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let mut req = TestRequest::get().uri(path);
    if !token.is_empty() {
        req = req.insert_header((header::AUTHORIZATION, format!("Bearer {token}")));
    }
    call_protected(req, configure).await
}

/// POST against an app wrapped with the bearer-token middleware.
pub async fn post_request(
    token: &str,
    path: &str,
    content_type: &str,
    body: &str,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    let mut req = TestRequest::post()
        .uri(path)
        .insert_header((header::CONTENT_TYPE, content_type.to_string()))
        .set_payload(body.to_string());
    if !token.is_empty() {
        req = req.insert_header((header::AUTHORIZATION, format!("Bearer {token}")));
    }
    call_protected(req, configure).await
}

/// POST against an app without the auth middleware (register/login). Also returns the Authorization response header.
pub async fn post_public(
    path: &str,
    content_type: &str,
    body: &str,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String, Option<String>) {
    let req = TestRequest::post()
        .uri(path)
        .insert_header((header::CONTENT_TYPE, content_type.to_string()))
        .set_payload(body.to_string())
        .to_request();
    let service = test::init_service(App::new().configure(configure)).await;
    match test::try_call_service(&service, req).await {
        Ok(res) => {
            let auth_header =
                res.headers().get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_string);
            let (status, body) = split_response(res);
            (status, body, auth_header)
        },
        Err(e) => {
            let (status, body) = split_error(e);
            (status, body, None)
        },
    }
}

async fn call_protected(req: TestRequest, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let app = App::new().wrap(JwtAuthMiddlewareFactory::new(test_secret())).configure(configure);
    let service = test::init_service(app).await;
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => split_response(res),
        Err(e) => split_error(e),
    }
}

fn split_response(res: ServiceResponse<BoxBody>) -> (StatusCode, String) {
    let (_, res) = res.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}

// Errors surfaced by middleware and extractors never reach the app-level response path in the test harness, so
// render them the way the server would.
fn split_error(e: actix_web::Error) -> (StatusCode, String) {
    let res = e.error_response();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}
