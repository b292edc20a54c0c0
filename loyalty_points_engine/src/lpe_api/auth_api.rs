use std::fmt::Debug;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use log::*;

use crate::{
    db_types::{NewUser, User},
    helpers::password_meets_policy,
    traits::{AuthApiError, UserManagement},
};

/// The `AuthApi` registers users and verifies login credentials. Passwords are stored as argon2 PHC strings; the
/// cleartext never reaches the backend.
pub struct AuthApi<B> {
    db: B,
}

impl<B> Debug for AuthApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthApi")
    }
}

impl<B> AuthApi<B>
where B: UserManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Registers a new user and returns it with its assigned id.
    ///
    /// The password must satisfy the password policy. A taken login yields [`AuthApiError::UserExists`], whether it
    /// is caught by the pre-check or by the unique index on the login column.
    pub async fn register(&self, login: &str, password: &str) -> Result<User, AuthApiError> {
        if !password_meets_policy(password) {
            return Err(AuthApiError::PasswordPolicyViolated);
        }
        if self.db.fetch_user_by_login(login).await?.is_some() {
            return Err(AuthApiError::UserExists);
        }
        let password_hash = hash_password(password)?;
        let user = self.db.create_user(NewUser::new(login.to_string(), password_hash)).await?;
        info!("👤️ User created with id {}", user.id);
        Ok(user)
    }

    /// Verifies the login/password pair and returns the user.
    ///
    /// An unknown login and a wrong password both map to [`AuthApiError::InvalidCredentials`], so the caller cannot
    /// probe which logins exist.
    pub async fn login(&self, login: &str, password: &str) -> Result<User, AuthApiError> {
        let user = self.db.fetch_user_by_login(login).await?.ok_or(AuthApiError::InvalidCredentials)?;
        if !verify_password(password, &user.password_hash)? {
            debug!("👤️ Password verification failed for user {}", user.id);
            return Err(AuthApiError::InvalidCredentials);
        }
        Ok(user)
    }
}

fn hash_password(password: &str) -> Result<String, AuthApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthApiError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, password_hash: &str) -> Result<bool, AuthApiError> {
    let parsed = PasswordHash::new(password_hash).map_err(|e| AuthApiError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

#[cfg(test)]
mod test {
    use super::{hash_password, verify_password};

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("correct-horse-battery").unwrap();
        assert!(verify_password("correct-horse-battery", &hash).unwrap());
        assert!(!verify_password("wrong-horse-battery!", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("correct-horse-battery").unwrap();
        let b = hash_password("correct-horse-battery").unwrap();
        assert_ne!(a, b);
    }
}
