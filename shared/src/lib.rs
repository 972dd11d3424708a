pub mod types;
pub mod error;
pub mod config;
pub mod storage;
pub mod identity;
pub mod gate;
pub mod responses;
pub mod posts;
pub mod auth;

use chrono::Duration;
use std::sync::Arc;

use identity::{IdentityProvider, LocalIdentity};
use storage::{MemoryStore, PostStore, UserStore};

/// Shared application state
pub struct AppState {
    pub posts: Arc<dyn PostStore>,
    pub users: Arc<dyn UserStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(
        posts: Arc<dyn PostStore>,
        users: Arc<dyn UserStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Arc<Self> {
        Arc::new(Self {
            posts,
            users,
            identity,
        })
    }

    /// Process-local state with tokens valid for `token_ttl`.
    pub fn in_memory(token_ttl: Duration) -> Arc<Self> {
        let store = Arc::new(MemoryStore::new());
        Self::new(
            store.clone(),
            store,
            Arc::new(LocalIdentity::new(token_ttl)),
        )
    }
}
