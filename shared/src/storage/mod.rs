//! Document storage for posts and user profiles.
//!
//! The service layer only talks to the [`PostStore`] and [`UserStore`] traits.
//! [`DynamoStore`] keeps both entity kinds in one table; [`MemoryStore`] backs
//! local runs and tests.

pub mod dynamo;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{PostRecord, UserRecord};

pub use dynamo::DynamoStore;
pub use memory::MemoryStore;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Replacement values for an owner-initiated update.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub title: String,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// All posts, in no particular order.
    async fn list_posts(&self) -> Result<Vec<PostRecord>, StoreError>;

    async fn get_post(&self, post_id: &str) -> Result<Option<PostRecord>, StoreError>;

    async fn insert_post(&self, post: &PostRecord) -> Result<(), StoreError>;

    /// Applies `changes` only if the post still exists and still belongs to
    /// `author_id`. Returns `None` when that condition no longer holds.
    async fn update_post(
        &self,
        post_id: &str,
        author_id: &str,
        changes: PostChanges,
    ) -> Result<Option<PostRecord>, StoreError>;

    /// Removes the post if it exists and belongs to `author_id`.
    /// Returns whether a record was removed.
    async fn delete_post(&self, post_id: &str, author_id: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn put_user(&self, user: &UserRecord) -> Result<(), StoreError>;

    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError>;
}
