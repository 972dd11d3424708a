//! Credential store seam.
//!
//! Passwords and token verification belong to the credential store; the API
//! only ever sees a subject id for a verified token.

pub mod cognito;
pub mod local;

use async_trait::async_trait;

pub use cognito::{CognitoIdentity, CognitoSettings};
pub use local::LocalIdentity;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("user already exists")]
    UserExists,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("{0}")]
    InvalidPassword(String),
    #[error("access token rejected")]
    InvalidToken,
    #[error("credential store error: {0}")]
    Provider(String),
}

/// Bearer token handed to a client after a successful sign-in.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: i64,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Creates a credential for `email` and returns its subject id.
    async fn sign_up(&self, email: &str, password: &str) -> Result<String, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<IssuedToken, IdentityError>;

    /// Verifies an access token and returns the subject id it was issued to.
    async fn resolve(&self, access_token: &str) -> Result<String, IdentityError>;

    /// Deletes the credential for `email`. Used to roll back a registration
    /// whose profile could not be written.
    async fn remove_user(&self, email: &str) -> Result<(), IdentityError>;
}
