use std::collections::HashMap;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{IdentityError, IdentityProvider, IssuedToken};

const MIN_PASSWORD_LEN: usize = 6;

struct Credential {
    user_id: String,
    salt: String,
    password_hash: String,
}

struct TokenGrant {
    user_id: String,
    expires_at: DateTime<Utc>,
}

/// In-process credential store for local runs and tests.
///
/// Passwords are kept as salted SHA-256 digests; tokens are random opaque
/// strings that expire after `token_ttl`.
pub struct LocalIdentity {
    token_ttl: Duration,
    credentials: RwLock<HashMap<String, Credential>>,
    tokens: RwLock<HashMap<String, TokenGrant>>,
}

impl LocalIdentity {
    pub fn new(token_ttl: Duration) -> Self {
        Self {
            token_ttl,
            credentials: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    general_purpose::STANDARD.encode(hasher.finalize())
}

fn new_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<String, IdentityError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::InvalidPassword(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let key = normalize_email(email);
        let mut credentials = self.credentials.write().await;
        if credentials.contains_key(&key) {
            return Err(IdentityError::UserExists);
        }

        let user_id = Uuid::new_v4().to_string();
        let salt = Uuid::new_v4().simple().to_string();
        let password_hash = hash_password(&salt, password);
        credentials.insert(
            key,
            Credential {
                user_id: user_id.clone(),
                salt,
                password_hash,
            },
        );

        tracing::info!("Local credential created for subject {}", user_id);
        Ok(user_id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<IssuedToken, IdentityError> {
        let user_id = {
            let credentials = self.credentials.read().await;
            let credential = credentials
                .get(&normalize_email(email))
                .ok_or(IdentityError::InvalidCredentials)?;
            if hash_password(&credential.salt, password) != credential.password_hash {
                return Err(IdentityError::InvalidCredentials);
            }
            credential.user_id.clone()
        };

        let access_token = new_token();
        let now = Utc::now();
        let mut tokens = self.tokens.write().await;
        tokens.retain(|_, grant| grant.expires_at > now);
        tokens.insert(
            access_token.clone(),
            TokenGrant {
                user_id,
                expires_at: now + self.token_ttl,
            },
        );
        drop(tokens);

        Ok(IssuedToken {
            access_token,
            expires_in: self.token_ttl.num_seconds(),
        })
    }

    async fn resolve(&self, access_token: &str) -> Result<String, IdentityError> {
        let mut tokens = self.tokens.write().await;
        let grant = tokens
            .get(access_token)
            .map(|grant| (grant.user_id.clone(), grant.expires_at));

        match grant {
            Some((user_id, expires_at)) if Utc::now() < expires_at => Ok(user_id),
            Some(_) => {
                tokens.remove(access_token);
                Err(IdentityError::InvalidToken)
            }
            None => Err(IdentityError::InvalidToken),
        }
    }

    async fn remove_user(&self, email: &str) -> Result<(), IdentityError> {
        let removed = self.credentials.write().await.remove(&normalize_email(email));
        if let Some(credential) = removed {
            self.tokens
                .write()
                .await
                .retain(|_, grant| grant.user_id != credential.user_id);
            tracing::info!("Local credential removed for subject {}", credential.user_id);
        }
        Ok(())
    }
}
