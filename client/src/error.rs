use crate::forms::FieldErrors;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    #[error("not signed in")]
    NotAuthenticated,
    #[error("API error {status}: {}", message_or_none(.message))]
    Api { status: u16, message: Option<String> },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("token storage error: {0}")]
    Storage(String),
}

fn message_or_none(message: &Option<String>) -> &str {
    message.as_deref().unwrap_or("no message")
}

impl ClientError {
    /// Message to show the user: the server's own message when it sent one,
    /// otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Api {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            ClientError::NotAuthenticated | ClientError::Api { status: 401, .. }
        )
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}
