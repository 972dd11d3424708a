use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{PostChanges, PostStore, StoreError, UserStore};
use crate::types::{PostRecord, UserRecord};

/// In-process backend for local runs (`BLOG_BACKEND=memory`) and tests.
/// Every conditional write is evaluated under the write lock.
#[derive(Default)]
pub struct MemoryStore {
    posts: RwLock<HashMap<String, PostRecord>>,
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn list_posts(&self) -> Result<Vec<PostRecord>, StoreError> {
        Ok(self.posts.read().await.values().cloned().collect())
    }

    async fn get_post(&self, post_id: &str) -> Result<Option<PostRecord>, StoreError> {
        Ok(self.posts.read().await.get(post_id).cloned())
    }

    async fn insert_post(&self, post: &PostRecord) -> Result<(), StoreError> {
        let mut posts = self.posts.write().await;
        if posts.contains_key(&post.post_id) {
            return Err(StoreError::Backend(format!(
                "post {} already exists",
                post.post_id
            )));
        }
        posts.insert(post.post_id.clone(), post.clone());
        Ok(())
    }

    async fn update_post(
        &self,
        post_id: &str,
        author_id: &str,
        changes: PostChanges,
    ) -> Result<Option<PostRecord>, StoreError> {
        let mut posts = self.posts.write().await;
        match posts.get_mut(post_id) {
            Some(post) if post.author_id == author_id => {
                post.title = changes.title;
                post.content = changes.content;
                post.updated_at = changes.updated_at;
                Ok(Some(post.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_post(&self, post_id: &str, author_id: &str) -> Result<bool, StoreError> {
        let mut posts = self.posts.write().await;
        let owned = posts
            .get(post_id)
            .is_some_and(|post| post.author_id == author_id);
        if owned {
            posts.remove(post_id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn put_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        self.users
            .write()
            .await
            .insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn post(id: &str, author: &str) -> PostRecord {
        let now = Utc::now();
        PostRecord {
            post_id: id.to_string(),
            title: "Title".to_string(),
            content: "Content".to_string(),
            author_id: author.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn update_requires_matching_author() {
        let store = MemoryStore::new();
        store.insert_post(&post("p1", "alice")).await.unwrap();

        let changes = PostChanges {
            title: "New".to_string(),
            content: "New content".to_string(),
            updated_at: Utc::now() + Duration::seconds(1),
        };

        let denied = store.update_post("p1", "bob", changes.clone()).await.unwrap();
        assert!(denied.is_none());
        assert_eq!(store.get_post("p1").await.unwrap().unwrap().title, "Title");

        let updated = store.update_post("p1", "alice", changes).await.unwrap().unwrap();
        assert_eq!(updated.title, "New");
        assert_eq!(updated.author_id, "alice");
    }

    #[tokio::test]
    async fn update_of_missing_post_does_not_create_it() {
        let store = MemoryStore::new();
        let changes = PostChanges {
            title: "Ghost".to_string(),
            content: "Ghost".to_string(),
            updated_at: Utc::now(),
        };

        assert!(store.update_post("nope", "alice", changes).await.unwrap().is_none());
        assert!(store.list_posts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_requires_matching_author() {
        let store = MemoryStore::new();
        store.insert_post(&post("p1", "alice")).await.unwrap();

        assert!(!store.delete_post("p1", "bob").await.unwrap());
        assert!(store.get_post("p1").await.unwrap().is_some());

        assert!(store.delete_post("p1", "alice").await.unwrap());
        assert!(store.get_post("p1").await.unwrap().is_none());
        assert!(!store.delete_post("p1", "alice").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = MemoryStore::new();
        store.insert_post(&post("p1", "alice")).await.unwrap();
        assert!(store.insert_post(&post("p1", "bob")).await.is_err());
        assert_eq!(store.get_post("p1").await.unwrap().unwrap().author_id, "alice");
    }
}
