use chrono::Duration;

use crate::identity::CognitoSettings;

const DEFAULT_TABLE_NAME: &str = "blog-platform";
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;
const MAX_TOKEN_TTL_SECS: i64 = 30 * 24 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// DynamoDB table + Cognito user pool
    DynamoDb,
    /// Everything in process; state is lost on cold start
    Memory,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings, read once at cold start.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: Backend,
    pub table_name: String,
    pub cognito: Option<CognitoSettings>,
    pub token_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match var("BLOG_BACKEND").as_deref().map(str::to_ascii_lowercase) {
            None => Backend::DynamoDb,
            Some(v) if v == "dynamodb" => Backend::DynamoDb,
            Some(v) if v == "memory" => Backend::Memory,
            Some(v) => {
                return Err(ConfigError::Invalid {
                    name: "BLOG_BACKEND",
                    value: v,
                })
            }
        };

        let table_name = var("TABLE_NAME").unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string());

        let token_ttl = match var("TOKEN_TTL_SECS") {
            None => Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(secs) if secs > 0 && secs <= MAX_TOKEN_TTL_SECS => Duration::seconds(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "TOKEN_TTL_SECS",
                        value: raw,
                    })
                }
            },
        };

        let cognito = match backend {
            Backend::Memory => None,
            Backend::DynamoDb => Some(CognitoSettings {
                client_id: var("COGNITO_CLIENT_ID").ok_or(ConfigError::Missing("COGNITO_CLIENT_ID"))?,
                client_secret: var("COGNITO_CLIENT_SECRET")
                    .ok_or(ConfigError::Missing("COGNITO_CLIENT_SECRET"))?,
                user_pool_id: var("COGNITO_USER_POOL_ID"),
            }),
        };

        Ok(Self {
            backend,
            table_name,
            cognito,
            token_ttl,
        })
    }
}
