//! Post service: list, get, create, update and delete.
//!
//! Mutations always follow the same order: read the post, compare its author
//! with the caller, and only then write. The write itself is conditional on the
//! post still existing with that author, so a post removed in between is
//! reported as missing instead of being recreated.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::gate::CallerIdentity;
use crate::storage::{PostChanges, PostStore, UserStore};
use crate::types::{Author, CreatePostRequest, MessageResponse, Post, PostRecord, UpdatePostRequest};
use crate::AppState;

/// Canonical form of a post id, or `None` when `raw` is not a valid reference.
/// Malformed ids are indistinguishable from missing posts.
pub fn parse_post_id(raw: &str) -> Option<String> {
    Uuid::parse_str(raw.trim()).ok().map(|id| id.to_string())
}

/// Validated title and content, both trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
}

impl PostDraft {
    pub fn from_fields(
        title: Option<String>,
        content: Option<String>,
    ) -> Result<Self, ServiceError> {
        let title = title.map(|t| t.trim().to_string()).unwrap_or_default();
        let content = content.map(|c| c.trim().to_string()).unwrap_or_default();
        if title.is_empty() || content.is_empty() {
            return Err(ServiceError::InvalidInput(
                "Please provide title and content".to_string(),
            ));
        }
        Ok(Self { title, content })
    }
}

impl TryFrom<CreatePostRequest> for PostDraft {
    type Error = ServiceError;

    fn try_from(req: CreatePostRequest) -> Result<Self, Self::Error> {
        Self::from_fields(req.title, req.content)
    }
}

impl TryFrom<UpdatePostRequest> for PostDraft {
    type Error = ServiceError;

    fn try_from(req: UpdatePostRequest) -> Result<Self, Self::Error> {
        Self::from_fields(req.title, req.content)
    }
}

/// Resolves author ids to summaries, at most one lookup per author per request.
struct AuthorResolver<'a> {
    users: &'a dyn UserStore,
    seen: HashMap<String, Option<Author>>,
}

impl<'a> AuthorResolver<'a> {
    fn new(users: &'a dyn UserStore) -> Self {
        Self {
            users,
            seen: HashMap::new(),
        }
    }

    async fn resolve(&mut self, author_id: &str) -> Result<Option<Author>, ServiceError> {
        if let Some(author) = self.seen.get(author_id) {
            return Ok(author.clone());
        }
        let author = self.users.get_user(author_id).await?.as_ref().map(Author::from);
        if author.is_none() {
            tracing::warn!("Author {} of a post has no user record", author_id);
        }
        self.seen.insert(author_id.to_string(), author.clone());
        Ok(author)
    }

    async fn render(&mut self, record: PostRecord) -> Result<Post, ServiceError> {
        let author = self.resolve(&record.author_id).await?;
        Ok(Post {
            id: record.post_id,
            title: record.title,
            content: record.content,
            author,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// All posts, newest first.
pub async fn list_posts(state: &AppState) -> Result<Vec<Post>, ServiceError> {
    let mut records = state.posts.list_posts().await?;
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.post_id.cmp(&a.post_id))
    });

    let mut resolver = AuthorResolver::new(state.users.as_ref());
    let mut posts = Vec::with_capacity(records.len());
    for record in records {
        posts.push(resolver.render(record).await?);
    }
    Ok(posts)
}

pub async fn get_post(state: &AppState, raw_id: &str) -> Result<Post, ServiceError> {
    let post_id = parse_post_id(raw_id).ok_or_else(ServiceError::post_not_found)?;
    let record = state
        .posts
        .get_post(&post_id)
        .await?
        .ok_or_else(ServiceError::post_not_found)?;

    AuthorResolver::new(state.users.as_ref()).render(record).await
}

pub async fn create_post(
    state: &AppState,
    caller: &CallerIdentity,
    draft: PostDraft,
) -> Result<Post, ServiceError> {
    let now = Utc::now();
    let record = PostRecord {
        post_id: Uuid::new_v4().to_string(),
        title: draft.title,
        content: draft.content,
        author_id: caller.user_id.clone(),
        created_at: now,
        updated_at: now,
    };

    state.posts.insert_post(&record).await?;
    tracing::info!("Post {} created by {}", record.post_id, caller.user_id);

    AuthorResolver::new(state.users.as_ref()).render(record).await
}

/// Read the post and confirm the caller owns it.
async fn owned_post(
    state: &AppState,
    raw_id: &str,
    caller: &CallerIdentity,
    action: &str,
) -> Result<PostRecord, ServiceError> {
    let post_id = parse_post_id(raw_id).ok_or_else(ServiceError::post_not_found)?;
    let record = state
        .posts
        .get_post(&post_id)
        .await?
        .ok_or_else(ServiceError::post_not_found)?;

    if record.author_id != caller.user_id {
        tracing::warn!(
            "User {} tried to {} post {} owned by {}",
            caller.user_id,
            action,
            record.post_id,
            record.author_id
        );
        return Err(ServiceError::Forbidden(format!(
            "Not authorized to {} this post",
            action
        )));
    }
    Ok(record)
}

pub async fn update_post(
    state: &AppState,
    raw_id: &str,
    caller: &CallerIdentity,
    draft: PostDraft,
) -> Result<Post, ServiceError> {
    let existing = owned_post(state, raw_id, caller, "update").await?;

    // updated_at never moves backwards, even if this host's clock lags
    let updated_at = Utc::now().max(existing.updated_at);
    let changes = PostChanges {
        title: draft.title,
        content: draft.content,
        updated_at,
    };

    let record = state
        .posts
        .update_post(&existing.post_id, &caller.user_id, changes)
        .await?
        .ok_or_else(ServiceError::post_not_found)?;
    tracing::info!("Post {} updated by {}", record.post_id, caller.user_id);

    AuthorResolver::new(state.users.as_ref()).render(record).await
}

pub async fn delete_post(
    state: &AppState,
    raw_id: &str,
    caller: &CallerIdentity,
) -> Result<MessageResponse, ServiceError> {
    let existing = owned_post(state, raw_id, caller, "delete").await?;

    if !state
        .posts
        .delete_post(&existing.post_id, &caller.user_id)
        .await?
    {
        return Err(ServiceError::post_not_found());
    }
    tracing::info!("Post {} deleted by {}", existing.post_id, caller.user_id);

    Ok(MessageResponse {
        message: "Post removed".to_string(),
    })
}
