
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ServiceError;
use crate::gate::CallerIdentity;
use crate::identity::{IdentityProvider, IssuedToken};
use crate::storage::UserStore;
use crate::types::{AuthResponse, LoginRequest, RegisterRequest, User, UserRecord};
use crate::AppState;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

fn required(field: Option<String>) -> Option<String> {
    field.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Register a credential and its profile, then sign the new user in.
pub async fn register(state: &AppState, req: RegisterRequest) -> Result<AuthResponse, ServiceError> {
    let (Some(name), Some(email), Some(password)) =
        (required(req.name), required(req.email), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(ServiceError::InvalidInput(
            "Please provide name, email and password".to_string(),
        ));
    };
    if !EMAIL_RE.is_match(&email) {
        return Err(ServiceError::InvalidInput(
            "Please enter a valid email address".to_string(),
        ));
    }

    tracing::info!("Registering user: {}", email);
    let user_id = state.identity.sign_up(&email, &password).await?;

    let record = UserRecord {
        user_id,
        name,
        email,
        created_at: Utc::now(),
    };
    if let Err(e) = state.users.put_user(&record).await {
        // Roll back the credential so the email can register again
        if let Err(cleanup) = state.identity.remove_user(&record.email).await {
            tracing::error!(
                "Could not remove credential {} after failed profile write: {}",
                record.user_id,
                cleanup
            );
        }
        return Err(e.into());
    }

    let token = state.identity.sign_in(&record.email, &password).await?;
    Ok(auth_response(token, User::from(&record)))
}

/// Exchange credentials for a bearer token and the user's profile.
pub async fn login(state: &AppState, req: LoginRequest) -> Result<AuthResponse, ServiceError> {
    let (Some(email), Some(password)) = (required(req.email), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(ServiceError::InvalidInput(
            "Please provide email and password".to_string(),
        ));
    };

    tracing::info!("Authenticating user: {}", email);
    let token = state.identity.sign_in(&email, &password).await?;

    // A token we were just handed must resolve; anything else is our fault.
    let user_id = state
        .identity
        .resolve(&token.access_token)
        .await
        .map_err(|e| ServiceError::Internal(format!("fresh token did not resolve: {}", e)))?;

    let record = state
        .users
        .get_user(&user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

    tracing::info!("Authentication successful for user: {}", email);
    Ok(auth_response(token, User::from(&record)))
}

/// Profile of the caller behind the current token.
pub async fn current_user(state: &AppState, caller: &CallerIdentity) -> Result<User, ServiceError> {
    state
        .users
        .get_user(&caller.user_id)
        .await?
        .as_ref()
        .map(User::from)
        .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
}

fn auth_response(token: IssuedToken, user: User) -> AuthResponse {
    AuthResponse {
        token: token.access_token,
        expires_in: token.expires_in,
        user,
    }
}
