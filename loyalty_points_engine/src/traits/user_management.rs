use thiserror::Error;

use crate::db_types::{NewUser, User};

#[derive(Debug, Clone, Error)]
pub enum AuthApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("A user with this login already exists")]
    UserExists,
    #[error("Wrong login or password")]
    InvalidCredentials,
    #[error("The password does not meet the password policy")]
    PasswordPolicyViolated,
    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

impl From<sqlx::Error> for AuthApiError {
    fn from(e: sqlx::Error) -> Self {
        AuthApiError::DatabaseError(e.to_string())
    }
}

/// The `UserManagement` trait defines behaviour for creating and looking up registered users. Users are created at
/// registration and immutable thereafter.
#[allow(async_fn_in_trait)]
pub trait UserManagement {
    /// Stores a new user and returns it with its assigned id. A login collision returns
    /// [`AuthApiError::UserExists`].
    async fn create_user(&self, user: NewUser) -> Result<User, AuthApiError>;

    /// Fetches the user with the given login. If no such user exists, `None` is returned.
    async fn fetch_user_by_login(&self, login: &str) -> Result<Option<User>, AuthApiError>;
}
