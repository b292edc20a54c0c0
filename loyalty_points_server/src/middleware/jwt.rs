//! Bearer-token middleware for the loyalty points server.
//!
//! The middleware checks the `Authorization: Bearer <token>` header, validates the session token and stores the
//! authenticated user id in the request extensions as a typed carrier. Handlers receive it through the
//! [`AuthenticatedUser`] extractor. Requests without a valid token are answered with 401 Unauthorized.

use std::{pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorUnauthorized,
    http::header,
    Error,
    FromRequest,
    HttpMessage,
    HttpRequest,
};
use futures::{
    future::{ok, ready, Ready},
    Future,
};
use log::warn;
use lpg_common::Secret;

use crate::auth::decode_user_id;

/// Request-scoped carrier for the authenticated user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: i64,
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthenticatedUser>()
                .copied()
                .ok_or_else(|| ErrorUnauthorized("missing bearer token")),
        )
    }
}

#[derive(Clone)]
pub struct JwtAuthMiddlewareFactory {
    secret: Secret<String>,
}

impl JwtAuthMiddlewareFactory {
    pub fn new(secret: Secret<String>) -> Self {
        JwtAuthMiddlewareFactory { secret }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = JwtAuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(JwtAuthMiddlewareService { secret: self.secret.clone(), service: Rc::new(service) })
    }
}

pub struct JwtAuthMiddlewareService<S> {
    secret: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.secret.clone();
        Box::pin(async move {
            let Some(token) = bearer_token(&req) else {
                warn!("🔑️ Request without a bearer token");
                return Err(ErrorUnauthorized("missing bearer token"));
            };
            match decode_user_id(&secret, &token) {
                Ok(user_id) => {
                    req.extensions_mut().insert(AuthenticatedUser { id: user_id });
                    service.call(req).await
                },
                Err(e) => {
                    warn!("🔑️ Rejecting request with an invalid token: {e}");
                    Err(ErrorUnauthorized("token validation failed"))
                },
            }
        })
    }
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.splitn(2, ' ');
    match (parts.next(), parts.next()) {
        (Some(scheme), Some(token)) if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => {
            Some(token.to_string())
        },
        _ => None,
    }
}
