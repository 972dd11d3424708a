use crate::api::{BlogApi, LoginPayload, Post, PostPayload, RegisterPayload, User};
use crate::error::ClientError;
use crate::forms::{LoginForm, PostForm, RegisterForm};
use crate::storage::TokenVault;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    /// A stored token is being checked against the server
    Authenticating,
    Authenticated(User),
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// One signed-in (or anonymous) user of the blog.
pub struct Session<A: BlogApi> {
    api: A,
    vault: TokenVault,
    state: AuthState,
    started: bool,
}

impl<A: BlogApi> Session<A> {
    pub fn new(api: A, vault: TokenVault) -> Self {
        Self {
            api,
            vault,
            state: AuthState::Unauthenticated,
            started: false,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Resolve a stored token into a user, once. A token the server rejects,
    /// or that cannot be checked, is discarded.
    pub async fn start(&mut self) -> &AuthState {
        if self.started {
            return &self.state;
        }
        self.started = true;

        let token = match self.vault.current() {
            Ok(Some(token)) => token,
            Ok(None) => return &self.state,
            Err(e) => {
                tracing::warn!("Could not read stored token: {}", e);
                return &self.state;
            }
        };

        self.state = AuthState::Authenticating;
        match self.api.me(&token).await {
            Ok(user) => {
                tracing::info!("Restored session for {}", user.email);
                self.state = AuthState::Authenticated(user);
            }
            Err(e) => {
                tracing::info!("Discarding stored token: {}", e);
                if let Err(e) = self.vault.clear_all() {
                    tracing::warn!("Could not clear stored token: {}", e);
                }
                self.state = AuthState::Unauthenticated;
            }
        }
        &self.state
    }

    pub async fn login(&mut self, form: &LoginForm, remember: bool) -> Result<User, ClientError> {
        form.validate()?;
        let payload = LoginPayload {
            email: form.email.trim().to_string(),
            password: form.password.clone(),
        };

        self.state = AuthState::Authenticating;
        let outcome = match self.api.login(&payload).await {
            Ok(auth) => self.vault.store(&auth.token, remember).map(|()| auth.user),
            Err(e) => Err(e),
        };
        self.settle(outcome)
    }

    pub async fn register(&mut self, form: &RegisterForm) -> Result<User, ClientError> {
        form.validate()?;
        let payload = RegisterPayload {
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            password: form.password.clone(),
        };

        self.state = AuthState::Authenticating;
        let outcome = match self.api.register(&payload).await {
            Ok(auth) => self.vault.store(&auth.token, false).map(|()| auth.user),
            Err(e) => Err(e),
        };
        self.settle(outcome)
    }

    /// Final transition of a login or registration attempt. A failure leaves
    /// no token behind, so a later `start` cannot restore an earlier session.
    fn settle(&mut self, outcome: Result<User, ClientError>) -> Result<User, ClientError> {
        match outcome {
            Ok(user) => {
                self.state = AuthState::Authenticated(user.clone());
                Ok(user)
            }
            Err(e) => {
                self.state = AuthState::Unauthenticated;
                if let Err(clear) = self.vault.clear_all() {
                    tracing::warn!("Could not clear stored token: {}", clear);
                }
                Err(e)
            }
        }
    }

    pub fn logout(&mut self) -> Result<(), ClientError> {
        self.state = AuthState::Unauthenticated;
        self.vault.clear_all()
    }

    pub async fn list_posts(&self) -> Result<Vec<Post>, ClientError> {
        self.api.list_posts().await
    }

    pub async fn get_post(&self, id: &str) -> Result<Post, ClientError> {
        self.api.get_post(id).await
    }

    pub async fn create_post(&self, form: &PostForm) -> Result<Post, ClientError> {
        let token = self.token()?;
        form.validate()?;
        self.api.create_post(&token, &payload(form)).await
    }

    pub async fn update_post(&self, id: &str, form: &PostForm) -> Result<Post, ClientError> {
        let token = self.token()?;
        form.validate()?;
        self.api.update_post(&token, id, &payload(form)).await
    }

    pub async fn delete_post(&self, id: &str) -> Result<String, ClientError> {
        let token = self.token()?;
        self.api.delete_post(&token, id).await
    }

    fn token(&self) -> Result<String, ClientError> {
        if !self.state.is_authenticated() {
            return Err(ClientError::NotAuthenticated);
        }
        self.vault.current()?.ok_or(ClientError::NotAuthenticated)
    }
}

fn payload(form: &PostForm) -> PostPayload {
    PostPayload {
        title: form.title.trim().to_string(),
        content: form.content.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AuthResponse;
    use crate::storage::{MemoryTokenStorage, TokenStorage};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    const GOOD_TOKEN: &str = "good-token";

    /// Records calls; accepts only `GOOD_TOKEN`.
    #[derive(Clone, Default)]
    struct FakeApi {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeApi {
        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn alice() -> User {
            User {
                id: "u-1".to_string(),
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
            }
        }

        fn check(token: &str) -> Result<(), ClientError> {
            if token == GOOD_TOKEN {
                Ok(())
            } else {
                Err(ClientError::Api {
                    status: 401,
                    message: Some("Not authorized, token failed".to_string()),
                })
            }
        }
    }

    #[async_trait]
    impl BlogApi for FakeApi {
        async fn register(&self, payload: &RegisterPayload) -> Result<AuthResponse, ClientError> {
            self.record("register");
            Ok(AuthResponse {
                token: GOOD_TOKEN.to_string(),
                expires_in: 3600,
                user: User {
                    name: payload.name.clone(),
                    email: payload.email.clone(),
                    ..Self::alice()
                },
            })
        }

        async fn login(&self, payload: &LoginPayload) -> Result<AuthResponse, ClientError> {
            self.record("login");
            if payload.password != "secret123" {
                return Err(ClientError::Api {
                    status: 401,
                    message: Some("Invalid email or password".to_string()),
                });
            }
            Ok(AuthResponse {
                token: GOOD_TOKEN.to_string(),
                expires_in: 3600,
                user: Self::alice(),
            })
        }

        async fn me(&self, token: &str) -> Result<User, ClientError> {
            self.record("me");
            Self::check(token)?;
            Ok(Self::alice())
        }

        async fn list_posts(&self) -> Result<Vec<Post>, ClientError> {
            self.record("list_posts");
            Ok(Vec::new())
        }

        async fn get_post(&self, id: &str) -> Result<Post, ClientError> {
            self.record("get_post");
            Err(ClientError::Api {
                status: 404,
                message: Some(format!("Post {} not found", id)),
            })
        }

        async fn create_post(&self, token: &str, payload: &PostPayload) -> Result<Post, ClientError> {
            self.record("create_post");
            Self::check(token)?;
            Ok(Post {
                id: "p-1".to_string(),
                title: payload.title.clone(),
                content: payload.content.clone(),
                author: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
        }

        async fn update_post(
            &self,
            token: &str,
            id: &str,
            payload: &PostPayload,
        ) -> Result<Post, ClientError> {
            self.record("update_post");
            Self::check(token)?;
            let mut post = self.create_post(token, payload).await?;
            post.id = id.to_string();
            Ok(post)
        }

        async fn delete_post(&self, token: &str, _id: &str) -> Result<String, ClientError> {
            self.record("delete_post");
            Self::check(token)?;
            Ok("Post removed".to_string())
        }
    }

    /// Vault over two in-memory storages, with handles to inspect them.
    fn vault() -> (TokenVault, Arc<MemoryTokenStorage>, Arc<MemoryTokenStorage>) {
        let durable = Arc::new(MemoryTokenStorage::new());
        let session = Arc::new(MemoryTokenStorage::new());
        let vault = TokenVault::new(
            Box::new(Shared(durable.clone())),
            Box::new(Shared(session.clone())),
        );
        (vault, durable, session)
    }

    struct Shared(Arc<MemoryTokenStorage>);

    impl TokenStorage for Shared {
        fn load(&self) -> Result<Option<String>, ClientError> {
            self.0.load()
        }
        fn save(&self, token: &str) -> Result<(), ClientError> {
            self.0.save(token)
        }
        fn clear(&self) -> Result<(), ClientError> {
            self.0.clear()
        }
    }

    fn login_form(password: &str) -> LoginForm {
        LoginForm {
            email: "alice@example.com".to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn start_with_valid_token_authenticates() {
        let (vault, durable, _) = vault();
        durable.save(GOOD_TOKEN).unwrap();
        let mut session = Session::new(FakeApi::default(), vault);

        assert_eq!(session.start().await, &AuthState::Authenticated(FakeApi::alice()));
    }

    #[tokio::test]
    async fn start_with_rejected_token_discards_it() {
        let (vault, durable, _) = vault();
        durable.save("stale").unwrap();
        let mut session = Session::new(FakeApi::default(), vault);

        assert_eq!(session.start().await, &AuthState::Unauthenticated);
        assert_eq!(durable.load().unwrap(), None);
    }

    #[tokio::test]
    async fn start_runs_once() {
        let api = FakeApi::default();
        let (vault, durable, _) = vault();
        durable.save(GOOD_TOKEN).unwrap();
        let mut session = Session::new(api.clone(), vault);

        session.start().await;
        session.start().await;
        assert_eq!(api.calls(), vec!["me"]);
    }

    #[tokio::test]
    async fn start_without_token_makes_no_request() {
        let api = FakeApi::default();
        let (vault, _, _) = vault();
        let mut session = Session::new(api.clone(), vault);

        assert_eq!(session.start().await, &AuthState::Unauthenticated);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn remember_choice_selects_storage() {
        let (vault, durable, session_store) = vault();
        let mut session = Session::new(FakeApi::default(), vault);

        session.login(&login_form("secret123"), true).await.unwrap();
        assert_eq!(durable.load().unwrap().as_deref(), Some(GOOD_TOKEN));
        assert_eq!(session_store.load().unwrap(), None);

        session.login(&login_form("secret123"), false).await.unwrap();
        assert_eq!(durable.load().unwrap(), None);
        assert_eq!(session_store.load().unwrap().as_deref(), Some(GOOD_TOKEN));

        session.logout().unwrap();
        assert_eq!(session.state(), &AuthState::Unauthenticated);
        assert_eq!(durable.load().unwrap(), None);
        assert_eq!(session_store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn failed_login_stays_unauthenticated() {
        let (vault, _, _) = vault();
        let mut session = Session::new(FakeApi::default(), vault);

        let err = session.login(&login_form("wrong-pass"), true).await.unwrap_err();
        assert_eq!(err.user_message("Login failed. Please try again."), "Invalid email or password");
        assert_eq!(session.state(), &AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn failed_relogin_forgets_previous_token() {
        let (vault, durable, session_store) = vault();
        let mut session = Session::new(FakeApi::default(), vault);
        session.login(&login_form("secret123"), true).await.unwrap();

        session.login(&login_form("wrong-pass"), true).await.unwrap_err();
        assert_eq!(session.state(), &AuthState::Unauthenticated);
        assert_eq!(durable.load().unwrap(), None);
        assert_eq!(session_store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn invalid_login_form_never_reaches_server() {
        let api = FakeApi::default();
        let (vault, _, _) = vault();
        let mut session = Session::new(api.clone(), vault);

        let err = session.login(&login_form("123"), false).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn register_stores_session_token() {
        let (vault, durable, session_store) = vault();
        let mut session = Session::new(FakeApi::default(), vault);

        let form = RegisterForm {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "secret123".to_string(),
            confirm_password: "secret123".to_string(),
            accept_terms: true,
        };
        let user = session.register(&form).await.unwrap();
        assert_eq!(user.name, "Alice");
        assert!(session.state().is_authenticated());
        assert_eq!(session_store.load().unwrap().as_deref(), Some(GOOD_TOKEN));
        assert_eq!(durable.load().unwrap(), None);
    }

    #[tokio::test]
    async fn writes_require_local_authentication() {
        let api = FakeApi::default();
        let (vault, _, session_store) = vault();
        session_store.save(GOOD_TOKEN).unwrap();
        let session = Session::new(api.clone(), vault);

        let form = PostForm {
            title: "Hello".to_string(),
            content: "Body".to_string(),
        };
        assert_eq!(session.create_post(&form).await.unwrap_err(), ClientError::NotAuthenticated);
        assert_eq!(
            session.update_post("p-1", &form).await.unwrap_err(),
            ClientError::NotAuthenticated
        );
        assert_eq!(session.delete_post("p-1").await.unwrap_err(), ClientError::NotAuthenticated);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn authenticated_post_operations() {
        let api = FakeApi::default();
        let (vault, _, _) = vault();
        let mut session = Session::new(api.clone(), vault);
        session.login(&login_form("secret123"), false).await.unwrap();

        let created = session
            .create_post(&PostForm {
                title: " Hello ".to_string(),
                content: "Body".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(created.title, "Hello");

        assert_eq!(session.delete_post(&created.id).await.unwrap(), "Post removed");
        assert!(session.list_posts().await.unwrap().is_empty());
        assert!(matches!(
            session.get_post("missing").await,
            Err(ClientError::Api { status: 404, .. })
        ));
    }
}
