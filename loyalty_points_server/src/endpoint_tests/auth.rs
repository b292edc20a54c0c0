use actix_web::{http::StatusCode, web, web::ServiceConfig};
use loyalty_points_engine::{db_types::User, AuthApi};

use super::{
    helpers::{post_public, test_issuer, test_secret},
    mocks::MockUserManager,
};
use crate::{auth::decode_user_id, routes};

fn auth_routes(cfg: &mut ServiceConfig, users: MockUserManager) {
    cfg.service(web::resource("/api/user/register").route(web::post().to(routes::register::<MockUserManager>)))
        .service(web::resource("/api/user/login").route(web::post().to(routes::login::<MockUserManager>)))
        .app_data(web::Data::new(AuthApi::new(users)))
        .app_data(web::Data::new(test_issuer()));
}

fn argon2_hash(password: &str) -> String {
    use argon2::{
        password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
        Argon2,
    };
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default().hash_password(password.as_bytes(), &salt).unwrap().to_string()
}

fn stored_alice() -> User {
    User { id: 1, login: "alice".to_string(), password_hash: argon2_hash("longenoughpwd1") }
}

#[actix_web::test]
async fn register_issues_a_session_token() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        let mut users = MockUserManager::new();
        users.expect_fetch_user_by_login().returning(|_| Ok(None));
        users
            .expect_create_user()
            .returning(|user| Ok(User { id: 1, login: user.login, password_hash: user.password_hash }));
        auth_routes(cfg, users);
    }
    let (status, body, auth_header) = post_public(
        "/api/user/register",
        "application/json",
        r#"{"login":"alice","password":"longenoughpwd1"}"#,
        configure,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let header = auth_header.expect("missing Authorization response header");
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    let token = parsed["token"].as_str().unwrap();
    assert_eq!(header, format!("Bearer {token}"));
    assert_eq!(decode_user_id(&test_secret(), token).unwrap(), 1);
}

#[actix_web::test]
async fn register_stores_a_hash_instead_of_the_password() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        let mut users = MockUserManager::new();
        users.expect_fetch_user_by_login().returning(|_| Ok(None));
        users.expect_create_user().withf(|user| user.password_hash != "longenoughpwd1").once().returning(|user| {
            Ok(User { id: 1, login: user.login, password_hash: user.password_hash })
        });
        auth_routes(cfg, users);
    }
    let (status, _, _) = post_public(
        "/api/user/register",
        "application/json",
        r#"{"login":"alice","password":"longenoughpwd1"}"#,
        configure,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn register_with_a_taken_login_conflicts() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        let mut users = MockUserManager::new();
        users.expect_fetch_user_by_login().returning(|_| Ok(Some(stored_alice())));
        auth_routes(cfg, users);
    }
    let (status, _, _) = post_public(
        "/api/user/register",
        "application/json",
        r#"{"login":"alice","password":"longenoughpwd1"}"#,
        configure,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn register_enforces_the_password_policy() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        // the policy check runs before any storage access
        auth_routes(cfg, MockUserManager::new());
    }
    let (status, body, _) =
        post_public("/api/user/register", "application/json", r#"{"login":"alice","password":"short"}"#, configure)
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "password policy violated");
}

#[actix_web::test]
async fn register_rejects_non_json_bodies() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        auth_routes(cfg, MockUserManager::new());
    }
    let (status, _, _) = post_public("/api/user/register", "text/plain", "alice", configure).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[actix_web::test]
async fn register_rejects_unknown_fields() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        auth_routes(cfg, MockUserManager::new());
    }
    let (status, _, _) = post_public(
        "/api/user/register",
        "application/json",
        r#"{"login":"alice","password":"longenoughpwd1","role":"admin"}"#,
        configure,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn login_issues_a_session_token() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        let mut users = MockUserManager::new();
        users.expect_fetch_user_by_login().returning(|_| Ok(Some(stored_alice())));
        auth_routes(cfg, users);
    }
    let (status, body, _) =
        post_public("/api/user/login", "application/json", r#"{"login":"alice","password":"longenoughpwd1"}"#, configure)
            .await;
    assert_eq!(status, StatusCode::OK);
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(decode_user_id(&test_secret(), parsed["token"].as_str().unwrap()).unwrap(), 1);
}

#[actix_web::test]
async fn login_with_a_wrong_password_is_unauthorized() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        let mut users = MockUserManager::new();
        users.expect_fetch_user_by_login().returning(|_| Ok(Some(stored_alice())));
        auth_routes(cfg, users);
    }
    let (status, body, _) =
        post_public("/api/user/login", "application/json", r#"{"login":"alice","password":"not-her-password"}"#, configure)
            .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "wrong login or password");
}

#[actix_web::test]
async fn login_with_an_unknown_login_is_indistinguishable_from_a_wrong_password() {
    let _ = env_logger::try_init();
    fn configure(cfg: &mut ServiceConfig) {
        let mut users = MockUserManager::new();
        users.expect_fetch_user_by_login().returning(|_| Ok(None));
        auth_routes(cfg, users);
    }
    let (status, body, _) =
        post_public("/api/user/login", "application/json", r#"{"login":"mallory","password":"longenoughpwd1"}"#, configure)
            .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "wrong login or password");
}
