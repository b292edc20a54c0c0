use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lpg_common::Secret;
use serde::{Deserialize, Serialize};

use crate::errors::AuthError;

/// The claims carried by a session token. The core treats the extracted user id as a trusted integer; everything else
/// about the session lives here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub user_id: i64,
    pub exp: i64,
}

/// Issues HS256 session tokens for authenticated users.
pub struct TokenIssuer {
    secret: Secret<String>,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: Secret<String>, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    pub fn issue_token(&self, user_id: i64) -> Result<String, AuthError> {
        let exp = Utc::now().timestamp() + self.ttl.as_secs() as i64;
        let claims = JwtClaims { user_id, exp };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.reveal().as_bytes()))
            .map_err(|e| AuthError::SigningError(e.to_string()))
    }
}

/// Validates a bearer token and extracts the user id. Expired tokens and bad signatures both fail validation.
pub fn decode_user_id(secret: &Secret<String>, token: &str) -> Result<i64, AuthError> {
    let data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.reveal().as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AuthError::ValidationError(e.to_string()))?;
    Ok(data.claims.user_id)
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use lpg_common::Secret;

    use super::{decode_user_id, JwtClaims, TokenIssuer};

    fn secret() -> Secret<String> {
        Secret::new("test-signing-key".to_string())
    }

    #[test]
    fn issued_tokens_round_trip() {
        let issuer = TokenIssuer::new(secret(), Duration::from_secs(3600));
        let token = issuer.issue_token(42).unwrap();
        assert_eq!(decode_user_id(&secret(), &token).unwrap(), 42);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let claims = JwtClaims { user_id: 42, exp: Utc::now().timestamp() - 600 };
        let token =
            encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-signing-key")).unwrap();
        assert!(decode_user_id(&secret(), &token).is_err());
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let issuer = TokenIssuer::new(secret(), Duration::from_secs(3600));
        let mut token = issuer.issue_token(42).unwrap();
        let len = token.len();
        token.replace_range(len - 10..len - 5, "00000");
        assert!(decode_user_id(&secret(), &token).is_err());
    }

    #[test]
    fn tokens_signed_with_another_key_are_rejected() {
        let issuer = TokenIssuer::new(Secret::new("some-other-key".to_string()), Duration::from_secs(3600));
        let token = issuer.issue_token(42).unwrap();
        assert!(decode_user_id(&secret(), &token).is_err());
    }
}
