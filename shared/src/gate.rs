use lambda_http::http::{header::AUTHORIZATION, HeaderMap};

use crate::error::ServiceError;
use crate::identity::{IdentityError, IdentityProvider};

/// The authenticated user behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub user_id: String,
}

fn no_token() -> ServiceError {
    ServiceError::Unauthorized("Not authorized, no token".to_string())
}

fn token_failed() -> ServiceError {
    ServiceError::Unauthorized("Not authorized, token failed".to_string())
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ServiceError> {
    let value = headers.get(AUTHORIZATION).ok_or_else(no_token)?;
    let value = value.to_str().map_err(|_| token_failed())?;

    let (scheme, token) = value.trim().split_once(' ').ok_or_else(token_failed)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer")
        || token.is_empty()
        || token.contains(char::is_whitespace)
    {
        return Err(token_failed());
    }
    Ok(token)
}

/// Resolve the request's bearer token to a caller identity.
///
/// Runs once per request with no retry or caching. Every failure, including a
/// credential store outage, is reported as Unauthorized.
pub async fn authorize(
    identity: &dyn IdentityProvider,
    headers: &HeaderMap,
) -> Result<CallerIdentity, ServiceError> {
    let token = bearer_token(headers)?;

    match identity.resolve(token).await {
        Ok(user_id) => Ok(CallerIdentity { user_id }),
        Err(IdentityError::InvalidToken) => {
            tracing::warn!("Rejected bearer token");
            Err(token_failed())
        }
        Err(e) => {
            tracing::warn!("Token verification unavailable: {}", e);
            Err(token_failed())
        }
    }
}
