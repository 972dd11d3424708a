use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: Option<Author>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterPayload {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostPayload {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: Option<String>,
}

/// The blog REST surface as seen by the client.
#[async_trait]
pub trait BlogApi: Send + Sync {
    async fn register(&self, payload: &RegisterPayload) -> Result<AuthResponse, ClientError>;

    async fn login(&self, payload: &LoginPayload) -> Result<AuthResponse, ClientError>;

    async fn me(&self, token: &str) -> Result<User, ClientError>;

    async fn list_posts(&self) -> Result<Vec<Post>, ClientError>;

    async fn get_post(&self, id: &str) -> Result<Post, ClientError>;

    async fn create_post(&self, token: &str, payload: &PostPayload) -> Result<Post, ClientError>;

    async fn update_post(
        &self,
        token: &str,
        id: &str,
        payload: &PostPayload,
    ) -> Result<Post, ClientError>;

    /// Returns the server's confirmation message.
    async fn delete_post(&self, token: &str, id: &str) -> Result<String, ClientError>;
}

/// [`BlogApi`] over HTTP.
pub struct HttpApi {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            http_client: reqwest::Client::new(),
        }
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}/api{}", self.base_url, path);
        let builder = self.http_client.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = response
            .json::<MessageBody>()
            .await
            .ok()
            .and_then(|body| body.message);
        tracing::debug!("API returned {}: {:?}", status, message);
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl BlogApi for HttpApi {
    async fn register(&self, payload: &RegisterPayload) -> Result<AuthResponse, ClientError> {
        self.send(self.request(Method::POST, "/auth/register", None).json(payload))
            .await
    }

    async fn login(&self, payload: &LoginPayload) -> Result<AuthResponse, ClientError> {
        self.send(self.request(Method::POST, "/auth/login", None).json(payload))
            .await
    }

    async fn me(&self, token: &str) -> Result<User, ClientError> {
        self.send(self.request(Method::GET, "/auth/me", Some(token)))
            .await
    }

    async fn list_posts(&self) -> Result<Vec<Post>, ClientError> {
        self.send(self.request(Method::GET, "/posts", None)).await
    }

    async fn get_post(&self, id: &str) -> Result<Post, ClientError> {
        self.send(self.request(Method::GET, &format!("/posts/{}", id), None))
            .await
    }

    async fn create_post(&self, token: &str, payload: &PostPayload) -> Result<Post, ClientError> {
        self.send(self.request(Method::POST, "/posts", Some(token)).json(payload))
            .await
    }

    async fn update_post(
        &self,
        token: &str,
        id: &str,
        payload: &PostPayload,
    ) -> Result<Post, ClientError> {
        self.send(
            self.request(Method::PUT, &format!("/posts/{}", id), Some(token))
                .json(payload),
        )
        .await
    }

    async fn delete_post(&self, token: &str, id: &str) -> Result<String, ClientError> {
        let body: MessageBody = self
            .send(self.request(Method::DELETE, &format!("/posts/{}", id), Some(token)))
            .await?;
        Ok(body.message.unwrap_or_default())
    }
}
