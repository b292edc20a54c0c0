use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Unsupported content type. Expected {0}")]
    UnsupportedContentType(&'static str),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("Could not initialize the server. {0}")]
    InitializeError(String),
    #[error("Authentication error. {0}")]
    AuthError(#[from] AuthError),
    #[error("The accrual collector terminated with an error. {0}")]
    CollectorFailed(String),
    #[error("Internal error. {0}")]
    Internal(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::AuthError(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).insert_header(ContentType::plaintext()).body(self.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("The authorization header is missing or malformed")]
    MissingToken,
    #[error("Token validation failed: {0}")]
    ValidationError(String),
    #[error("Could not sign the token: {0}")]
    SigningError(String),
}
