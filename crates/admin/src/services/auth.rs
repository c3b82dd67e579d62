//! Operator authentication.
//!
//! The panel has a single operator whose email and Argon2 hash come from
//! configuration.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use vitrina_core::{Email, EmailError};

use crate::config::AuthConfig;

/// Minimum password length accepted by [`hash_password`].
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Password hashing error.
    #[error("password hashing failed")]
    PasswordHash,
}

/// Checks login attempts against the configured operator.
#[derive(Clone)]
pub struct AdminCredentials {
    email: Email,
    password_hash: SecretString,
}

impl AdminCredentials {
    #[must_use]
    pub const fn new(email: Email, password_hash: SecretString) -> Self {
        Self {
            email,
            password_hash,
        }
    }

    #[must_use]
    pub const fn email(&self) -> &Email {
        &self.email
    }

    /// Verify a login attempt and return the normalised email.
    ///
    /// The password is checked even when the email does not match so both
    /// failures take the same time.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for a malformed address and
    /// `AuthError::InvalidCredentials` for any mismatch.
    pub fn verify(&self, email: &str, password: &str) -> Result<Email, AuthError> {
        let email = Email::parse(email)?;
        let password_ok = verify_password(password, self.password_hash.expose_secret()).is_ok();

        if password_ok && email == self.email {
            Ok(email)
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

impl From<AuthConfig> for AdminCredentials {
    fn from(config: AuthConfig) -> Self {
        Self::new(config.email, config.password_hash)
    }
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short and
/// `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn credentials() -> AdminCredentials {
        AdminCredentials::new(
            Email::parse("owner@example.com").unwrap(),
            SecretString::from(hash_password("correct horse").unwrap()),
        )
    }

    #[test]
    fn test_hash_is_argon2id_phc() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert_ne!(hash, hash_password("correct horse").unwrap());
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            hash_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_verify_accepts_normalised_email() {
        let email = credentials()
            .verify("  Owner@Example.com ", "correct horse")
            .unwrap();
        assert_eq!(email.as_str(), "owner@example.com");
    }

    #[test]
    fn test_verify_rejects_wrong_password() {
        assert!(matches!(
            credentials().verify("owner@example.com", "battery staple"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_other_email() {
        assert!(matches!(
            credentials().verify("intruder@example.com", "correct horse"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_malformed_email() {
        assert!(matches!(
            credentials().verify("nope", "correct horse"),
            Err(AuthError::InvalidEmail(_))
        ));
    }
}
