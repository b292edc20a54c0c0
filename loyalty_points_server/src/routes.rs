//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Every handler is generic over the backend trait it needs, so the endpoint tests can drive them against mock
//! backends. The concrete wiring to [`loyalty_points_engine::PostgresDatabase`] happens in
//! [`configure_api`] / `server.rs`.

use actix_web::{
    http::header,
    web,
    web::ServiceConfig,
    HttpRequest,
    HttpResponse,
};
use log::*;
use loyalty_points_engine::{
    traits::{
        AuthApiError,
        BalanceApiError,
        BalanceManagement,
        HealthCheck,
        InsertOrderResult,
        OrderApiError,
        OrderManagement,
        UserManagement,
        WithdrawalManagement,
    },
    AuthApi,
    BalanceApi,
    HealthApi,
    OrderApi,
    WithdrawalApi,
};

use crate::{
    auth::TokenIssuer,
    data_objects::{AuthRequest, AuthResponse, BalanceResponse, OrderResponse, WithdrawRequest, WithdrawalResponse},
    errors::ServerError,
    middleware::{AuthenticatedUser, JwtAuthMiddlewareFactory},
};

/// Registers every route of the public API. Resources under `/api/user` that require a session are wrapped with the
/// bearer-token middleware; register and login stay open.
pub fn configure_api<B>(jwt: JwtAuthMiddlewareFactory) -> impl FnOnce(&mut ServiceConfig)
where B: UserManagement + OrderManagement + BalanceManagement + WithdrawalManagement + HealthCheck + 'static
{
    move |cfg: &mut ServiceConfig| {
        cfg.service(web::resource("/health").route(web::get().to(health::<B>))).service(
            web::scope("/api/user")
                .service(web::resource("/register").route(web::post().to(register::<B>)))
                .service(web::resource("/login").route(web::post().to(login::<B>)))
                .service(
                    web::resource("/orders")
                        .wrap(jwt.clone())
                        .route(web::get().to(list_orders::<B>))
                        .route(web::post().to(submit_order::<B>)),
                )
                .service(web::resource("/balance").wrap(jwt.clone()).route(web::get().to(get_balance::<B>)))
                .service(web::resource("/balance/withdraw").wrap(jwt.clone()).route(web::post().to(withdraw::<B>)))
                .service(web::resource("/withdrawals").wrap(jwt).route(web::get().to(list_withdrawals::<B>))),
        );
    }
}

// ----------------------------------------------   Health  ----------------------------------------------------
pub async fn health<B: HealthCheck>(api: web::Data<HealthApi<B>>) -> HttpResponse {
    trace!("💻️ Received health check request");
    match api.check().await {
        Ok(()) => HttpResponse::Ok().body("👍️\n"),
        Err(e) => {
            error!("💻️ Health check failed: {e}");
            HttpResponse::InternalServerError().finish()
        },
    }
}

//----------------------------------------------   Auth  ----------------------------------------------------
/// Route handler for user registration.
///
/// Registers a new user and immediately issues a session token, returned both in the body and as an
/// `Authorization: Bearer` response header. The password must be 12 to 64 code points long.
pub async fn register<B: UserManagement>(
    api: web::Data<AuthApi<B>>,
    signer: web::Data<TokenIssuer>,
    body: web::Json<AuthRequest>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received registration request");
    let AuthRequest { login, password } = body.into_inner();
    match api.register(&login, &password).await {
        Ok(user) => session_response(&signer, user.id),
        Err(AuthApiError::UserExists) => {
            debug!("💻️ Login {login} is already taken");
            Ok(HttpResponse::Conflict().body("a user with this login already exists"))
        },
        Err(AuthApiError::PasswordPolicyViolated) => Ok(HttpResponse::BadRequest().body("password policy violated")),
        Err(e) => {
            error!("💻️ Failed to register user {login}: {e}");
            Ok(HttpResponse::InternalServerError().finish())
        },
    }
}

/// Route handler for user login. Wrong login and wrong password are indistinguishable to the caller.
pub async fn login<B: UserManagement>(
    api: web::Data<AuthApi<B>>,
    signer: web::Data<TokenIssuer>,
    body: web::Json<AuthRequest>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received login request");
    let AuthRequest { login, password } = body.into_inner();
    match api.login(&login, &password).await {
        Ok(user) => session_response(&signer, user.id),
        Err(AuthApiError::InvalidCredentials) => Ok(HttpResponse::Unauthorized().body("wrong login or password")),
        Err(e) => {
            error!("💻️ Failed to log in user {login}: {e}");
            Ok(HttpResponse::InternalServerError().finish())
        },
    }
}

fn session_response(signer: &TokenIssuer, user_id: i64) -> Result<HttpResponse, ServerError> {
    let token = signer.issue_token(user_id).map_err(|e| ServerError::Internal(e.to_string()))?;
    Ok(HttpResponse::Ok()
        .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
        .json(AuthResponse { token }))
}

//----------------------------------------------   Orders  ----------------------------------------------------
/// Route handler for order submission.
///
/// The body is the plain-text order number. Submission is idempotent for the owner (200), a number already submitted
/// by another user is a conflict (409), and a fresh number is accepted for asynchronous accrual processing (202).
pub async fn submit_order<B: OrderManagement>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<OrderApi<B>>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ServerError> {
    expect_content_type(&req, "text/plain")?;
    let number = String::from_utf8(body.to_vec()).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    match api.submit_order(user.id, &number).await {
        Ok(InsertOrderResult::Inserted(_)) => Ok(HttpResponse::Accepted().finish()),
        Ok(InsertOrderResult::AlreadyExistsForUser) => Ok(HttpResponse::Ok().body("order already submitted")),
        Ok(InsertOrderResult::AlreadyExistsForOtherUser) => {
            Ok(HttpResponse::Conflict().body("order already submitted by another user"))
        },
        Err(OrderApiError::EmptyOrderNumber) => Ok(HttpResponse::BadRequest().body("empty order number")),
        Err(OrderApiError::InvalidOrderNumber) => {
            Ok(HttpResponse::UnprocessableEntity().body("order number fails validation"))
        },
        Err(e) => {
            error!("💻️ Failed to submit order for user {}: {e}", user.id);
            Ok(HttpResponse::InternalServerError().finish())
        },
    }
}

/// Route handler for the order list. Returns 204 when the user has not submitted anything yet.
pub async fn list_orders<B: OrderManagement>(
    api: web::Data<OrderApi<B>>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ServerError> {
    let orders = match api.orders_for_user(user.id).await {
        Ok(orders) => orders,
        Err(e) => {
            error!("💻️ Failed to list orders for user {}: {e}", user.id);
            return Ok(HttpResponse::InternalServerError().finish());
        },
    };
    if orders.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    let response: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

//----------------------------------------------   Balance  ----------------------------------------------------
pub async fn get_balance<B: BalanceManagement>(
    api: web::Data<BalanceApi<B>>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ServerError> {
    match api.balance_for_user(user.id).await {
        Ok(balance) => Ok(HttpResponse::Ok().json(BalanceResponse::from(balance))),
        Err(e) => {
            error!("💻️ Failed to compute balance for user {}: {e}", user.id);
            Ok(HttpResponse::InternalServerError().finish())
        },
    }
}

/// Route handler for spending points. The atomicity of the balance check lives in the storage layer; this handler
/// only translates the outcome.
pub async fn withdraw<B: BalanceManagement>(
    api: web::Data<BalanceApi<B>>,
    user: AuthenticatedUser,
    body: web::Json<WithdrawRequest>,
) -> Result<HttpResponse, ServerError> {
    let WithdrawRequest { order, sum } = body.into_inner();
    match api.withdraw(user.id, &order, sum).await {
        Ok(()) => Ok(HttpResponse::Ok().finish()),
        Err(BalanceApiError::InsufficientPoints) => Ok(HttpResponse::PaymentRequired().body("insufficient points")),
        Err(BalanceApiError::EmptyOrderNumber) => Ok(HttpResponse::BadRequest().body("empty order number")),
        Err(BalanceApiError::InvalidOrderNumber | BalanceApiError::NonPositiveSum) => {
            Ok(HttpResponse::UnprocessableEntity().body("withdrawal fails validation"))
        },
        Err(e) => {
            error!("💻️ Failed to withdraw points for user {}: {e}", user.id);
            Ok(HttpResponse::InternalServerError().finish())
        },
    }
}

//----------------------------------------------   Withdrawals  ----------------------------------------------------
pub async fn list_withdrawals<B: WithdrawalManagement>(
    api: web::Data<WithdrawalApi<B>>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ServerError> {
    let withdrawals = match api.withdrawals_for_user(user.id).await {
        Ok(withdrawals) => withdrawals,
        Err(e) => {
            error!("💻️ Failed to list withdrawals for user {}: {e}", user.id);
            return Ok(HttpResponse::InternalServerError().finish());
        },
    };
    if withdrawals.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    let response: Vec<WithdrawalResponse> = withdrawals.into_iter().map(WithdrawalResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

fn expect_content_type(req: &HttpRequest, expected: &'static str) -> Result<(), ServerError> {
    let content_type = req.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or_default();
    if content_type == expected || content_type.strip_prefix(expected).is_some_and(|rest| rest.starts_with(';')) {
        Ok(())
    } else {
        debug!("💻️ Request with an unsupported content type: {content_type}");
        Err(ServerError::UnsupportedContentType(expected))
    }
}
