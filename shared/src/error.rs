use lambda_http::http::StatusCode;
use serde::Serialize;

use crate::identity::IdentityError;
use crate::storage::StoreError;

/// Outcome of a failed API operation. Every handler funnels into one of these.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Unauthorized(String),
    /// Ownership mismatch. Reported with 401 for compatibility with existing clients.
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized(_) | ServiceError::Forbidden(_) => StatusCode::UNAUTHORIZED,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::InvalidInput(_) => "InvalidInput",
            ServiceError::Unauthorized(_) => "Unauthorized",
            ServiceError::Forbidden(_) => "Forbidden",
            ServiceError::NotFound(_) => "NotFound",
            ServiceError::Internal(_) => "Internal",
        }
    }

    /// Body sent to clients. Internal details stay in the logs.
    pub fn to_response(&self) -> ErrorResponse {
        let message = match self {
            ServiceError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        ErrorResponse {
            error: self.kind().to_string(),
            message,
        }
    }

    pub fn post_not_found() -> Self {
        ServiceError::NotFound("Post not found".to_string())
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl From<IdentityError> for ServiceError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::UserExists => ServiceError::InvalidInput("User already exists".to_string()),
            IdentityError::InvalidCredentials => {
                ServiceError::Unauthorized("Invalid email or password".to_string())
            }
            IdentityError::InvalidPassword(msg) => ServiceError::InvalidInput(msg),
            IdentityError::InvalidToken => {
                ServiceError::Unauthorized("Not authorized, token failed".to_string())
            }
            IdentityError::Provider(msg) => ServiceError::Internal(msg),
        }
    }
}
