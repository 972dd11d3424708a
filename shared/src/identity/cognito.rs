use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::types::{AttributeType, AuthFlowType};
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{IdentityError, IdentityProvider, IssuedToken};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct CognitoSettings {
    pub client_id: String,
    pub client_secret: String,
    /// Enables admin auto-confirm right after sign-up.
    pub user_pool_id: Option<String>,
}

/// Cognito user pool acting as the credential store. Usernames are emails.
pub struct CognitoIdentity {
    client: CognitoClient,
    settings: CognitoSettings,
}

impl CognitoIdentity {
    pub fn new(client: CognitoClient, settings: CognitoSettings) -> Self {
        Self { client, settings }
    }

    fn secret_hash(&self, username: &str) -> Result<String, IdentityError> {
        compute_secret_hash(username, &self.settings.client_id, &self.settings.client_secret)
    }
}

/// Compute the SECRET_HASH Cognito expects from app clients with a secret.
fn compute_secret_hash(
    username: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<String, IdentityError> {
    let message = format!("{}{}", username, client_id);
    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .map_err(|e| IdentityError::Provider(format!("bad client secret: {}", e)))?;
    mac.update(message.as_bytes());
    let result = mac.finalize();
    Ok(general_purpose::STANDARD.encode(result.into_bytes()))
}

#[async_trait]
impl IdentityProvider for CognitoIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<String, IdentityError> {
        let secret_hash = self.secret_hash(email)?;
        let email_attr = AttributeType::builder()
            .name("email")
            .value(email)
            .build()
            .map_err(|e| IdentityError::Provider(e.to_string()))?;

        let signup_result = self
            .client
            .sign_up()
            .client_id(&self.settings.client_id)
            .username(email)
            .password(password)
            .secret_hash(&secret_hash)
            .user_attributes(email_attr)
            .send()
            .await;

        let response = match signup_result {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Cognito signup error: {:?}", e);
                let service_error = e.as_service_error();
                if service_error.is_some_and(|se| se.is_username_exists_exception()) {
                    return Err(IdentityError::UserExists);
                }
                if service_error.is_some_and(|se| se.is_invalid_password_exception()) {
                    return Err(IdentityError::InvalidPassword(
                        "Password must contain at least 8 characters with uppercase, lowercase, number, and special character".to_string(),
                    ));
                }
                if service_error.is_some_and(|se| se.is_invalid_parameter_exception()) {
                    return Err(IdentityError::InvalidPassword(
                        "Invalid email or password format".to_string(),
                    ));
                }
                return Err(IdentityError::Provider("Signup failed".to_string()));
            }
        };

        let user_sub = response.user_sub().to_string();
        tracing::info!("Signup successful, subject {}", user_sub);

        // Auto-confirm so the new user can sign in immediately
        match &self.settings.user_pool_id {
            Some(user_pool_id) => {
                if let Err(e) = self
                    .client
                    .admin_confirm_sign_up()
                    .user_pool_id(user_pool_id)
                    .username(email)
                    .send()
                    .await
                {
                    tracing::error!("Failed to auto-confirm user: {:?}", e);
                }
            }
            None => tracing::warn!("COGNITO_USER_POOL_ID not set; skipping auto-confirm"),
        }

        Ok(user_sub)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<IssuedToken, IdentityError> {
        let secret_hash = self.secret_hash(email)?;

        let auth_result = self
            .client
            .initiate_auth()
            .auth_flow(AuthFlowType::UserPasswordAuth)
            .client_id(&self.settings.client_id)
            .auth_parameters("USERNAME", email)
            .auth_parameters("PASSWORD", password)
            .auth_parameters("SECRET_HASH", &secret_hash)
            .send()
            .await;

        match auth_result {
            Ok(response) => match response.authentication_result() {
                Some(result) => {
                    let access_token = result.access_token().unwrap_or_default().to_string();
                    if access_token.is_empty() {
                        tracing::error!("Authentication result carried no access token");
                        return Err(IdentityError::InvalidCredentials);
                    }
                    Ok(IssuedToken {
                        access_token,
                        expires_in: i64::from(result.expires_in()),
                    })
                }
                None => {
                    tracing::error!(
                        "No authentication result returned (challenge: {:?})",
                        response.challenge_name()
                    );
                    Err(IdentityError::InvalidCredentials)
                }
            },
            Err(e) => {
                tracing::error!("Cognito authentication error: {:?}", e);
                let rejected = e.as_service_error().is_some_and(|se| {
                    se.is_not_authorized_exception()
                        || se.is_user_not_found_exception()
                        || se.is_user_not_confirmed_exception()
                        || se.is_password_reset_required_exception()
                });
                if rejected {
                    Err(IdentityError::InvalidCredentials)
                } else {
                    Err(IdentityError::Provider("Login failed".to_string()))
                }
            }
        }
    }

    async fn resolve(&self, access_token: &str) -> Result<String, IdentityError> {
        let result = self.client.get_user().access_token(access_token).send().await;

        match result {
            Ok(output) => {
                let sub = output
                    .user_attributes()
                    .iter()
                    .find(|attr| attr.name() == "sub")
                    .and_then(|attr| attr.value())
                    .unwrap_or_else(|| output.username());
                Ok(sub.to_string())
            }
            Err(e) => {
                let rejected = e.as_service_error().is_some_and(|se| {
                    se.is_not_authorized_exception() || se.is_user_not_found_exception()
                });
                if rejected {
                    Err(IdentityError::InvalidToken)
                } else {
                    tracing::error!("Cognito get_user error: {:?}", e);
                    Err(IdentityError::Provider("Token verification failed".to_string()))
                }
            }
        }
    }

    async fn remove_user(&self, email: &str) -> Result<(), IdentityError> {
        let Some(user_pool_id) = &self.settings.user_pool_id else {
            return Err(IdentityError::Provider(
                "COGNITO_USER_POOL_ID not set; cannot delete user".to_string(),
            ));
        };

        self.client
            .admin_delete_user()
            .user_pool_id(user_pool_id)
            .username(email)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Cognito admin_delete_user error: {:?}", e);
                IdentityError::Provider("Failed to delete user".to_string())
            })?;

        tracing::info!("Deleted Cognito user {}", email);
        Ok(())
    }
}
