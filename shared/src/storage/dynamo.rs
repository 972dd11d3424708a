use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client as DynamoClient;
use chrono::{DateTime, Utc};

use super::{PostChanges, PostStore, StoreError, UserStore};
use crate::types::{PostRecord, UserRecord};

type Item = HashMap<String, AttributeValue>;

const POST_ENTITY: &str = "post";
const USER_ENTITY: &str = "user";

/// Single-table DynamoDB backend.
///
/// Posts live under `PK = SK = POST#<id>`, user profiles under
/// `PK = SK = USER#<id>`. Both carry an `entity_type` attribute so a scan can
/// pick out one kind.
#[derive(Clone)]
pub struct DynamoStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

fn post_key(post_id: &str) -> String {
    format!("POST#{}", post_id)
}

fn user_key(user_id: &str) -> String {
    format!("USER#{}", user_id)
}

fn backend<E: std::error::Error>(err: E) -> StoreError {
    StoreError::Backend(DisplayErrorContext(err).to_string())
}

fn attr_s(item: &Item, key: &str, name: &str) -> Result<String, StoreError> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
        .ok_or_else(|| StoreError::Corrupt {
            key: key.to_string(),
            reason: format!("missing string attribute {}", name),
        })
}

fn attr_time(item: &Item, key: &str, name: &str) -> Result<DateTime<Utc>, StoreError> {
    let raw = attr_s(item, key, name)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: format!("bad timestamp in {}: {}", name, e),
        })
}

fn post_from_item(item: &Item) -> Result<PostRecord, StoreError> {
    let pk = attr_s(item, "?", "PK")?;
    let post_id = pk
        .strip_prefix("POST#")
        .ok_or_else(|| StoreError::Corrupt {
            key: pk.clone(),
            reason: "not a post key".to_string(),
        })?
        .to_string();

    Ok(PostRecord {
        post_id,
        title: attr_s(item, &pk, "title")?,
        content: attr_s(item, &pk, "content")?,
        author_id: attr_s(item, &pk, "author_id")?,
        created_at: attr_time(item, &pk, "created_at")?,
        updated_at: attr_time(item, &pk, "updated_at")?,
    })
}

fn user_from_item(user_id: &str, item: &Item) -> Result<UserRecord, StoreError> {
    let pk = user_key(user_id);
    Ok(UserRecord {
        user_id: user_id.to_string(),
        name: attr_s(item, &pk, "name")?,
        email: attr_s(item, &pk, "email")?,
        created_at: attr_time(item, &pk, "created_at")?,
    })
}

#[async_trait]
impl PostStore for DynamoStore {
    async fn list_posts(&self) -> Result<Vec<PostRecord>, StoreError> {
        let mut posts = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let resp = self
                .client
                .scan()
                .table_name(&self.table_name)
                .filter_expression("entity_type = :type")
                .expression_attribute_values(":type", AttributeValue::S(POST_ENTITY.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(backend)?;

            for item in resp.items() {
                posts.push(post_from_item(item)?);
            }

            match resp.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        tracing::debug!("Scanned {} posts from {}", posts.len(), self.table_name);
        Ok(posts)
    }

    async fn get_post(&self, post_id: &str) -> Result<Option<PostRecord>, StoreError> {
        let pk = post_key(post_id);

        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk.clone()))
            .key("SK", AttributeValue::S(pk))
            .send()
            .await
            .map_err(backend)?;

        result.item().map(post_from_item).transpose()
    }

    async fn insert_post(&self, post: &PostRecord) -> Result<(), StoreError> {
        let pk = post_key(&post.post_id);

        self.client
            .put_item()
            .table_name(&self.table_name)
            .item("PK", AttributeValue::S(pk.clone()))
            .item("SK", AttributeValue::S(pk))
            .item("entity_type", AttributeValue::S(POST_ENTITY.to_string()))
            .item("title", AttributeValue::S(post.title.clone()))
            .item("content", AttributeValue::S(post.content.clone()))
            .item("author_id", AttributeValue::S(post.author_id.clone()))
            .item("created_at", AttributeValue::S(post.created_at.to_rfc3339()))
            .item("updated_at", AttributeValue::S(post.updated_at.to_rfc3339()))
            .condition_expression("attribute_not_exists(PK)")
            .send()
            .await
            .map_err(backend)?;

        Ok(())
    }

    async fn update_post(
        &self,
        post_id: &str,
        author_id: &str,
        changes: PostChanges,
    ) -> Result<Option<PostRecord>, StoreError> {
        let pk = post_key(post_id);

        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk.clone()))
            .key("SK", AttributeValue::S(pk))
            .update_expression("SET #title = :title, #content = :content, #updated_at = :updated_at")
            .condition_expression("attribute_exists(PK) AND #author_id = :author_id")
            .expression_attribute_names("#title", "title")
            .expression_attribute_names("#content", "content")
            .expression_attribute_names("#updated_at", "updated_at")
            .expression_attribute_names("#author_id", "author_id")
            .expression_attribute_values(":title", AttributeValue::S(changes.title))
            .expression_attribute_values(":content", AttributeValue::S(changes.content))
            .expression_attribute_values(
                ":updated_at",
                AttributeValue::S(changes.updated_at.to_rfc3339()),
            )
            .expression_attribute_values(":author_id", AttributeValue::S(author_id.to_string()))
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match result {
            Ok(output) => output.attributes().map(post_from_item).transpose(),
            Err(err) => {
                let rejected = err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception());
                if rejected {
                    tracing::warn!("Conditional update rejected for post {}", post_id);
                    Ok(None)
                } else {
                    Err(backend(err))
                }
            }
        }
    }

    async fn delete_post(&self, post_id: &str, author_id: &str) -> Result<bool, StoreError> {
        let pk = post_key(post_id);

        let result = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk.clone()))
            .key("SK", AttributeValue::S(pk))
            .condition_expression("attribute_exists(PK) AND #author_id = :author_id")
            .expression_attribute_names("#author_id", "author_id")
            .expression_attribute_values(":author_id", AttributeValue::S(author_id.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                let rejected = err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception());
                if rejected {
                    tracing::warn!("Conditional delete rejected for post {}", post_id);
                    Ok(false)
                } else {
                    Err(backend(err))
                }
            }
        }
    }
}

#[async_trait]
impl UserStore for DynamoStore {
    async fn put_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        let pk = user_key(&user.user_id);

        // Store user with PK=USER#sub, SK=USER#sub
        self.client
            .put_item()
            .table_name(&self.table_name)
            .item("PK", AttributeValue::S(pk.clone()))
            .item("SK", AttributeValue::S(pk))
            .item("entity_type", AttributeValue::S(USER_ENTITY.to_string()))
            .item("name", AttributeValue::S(user.name.clone()))
            .item("email", AttributeValue::S(user.email.clone()))
            .item("created_at", AttributeValue::S(user.created_at.to_rfc3339()))
            .send()
            .await
            .map_err(backend)?;

        tracing::info!("User profile saved: {}", user.user_id);
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        let pk = user_key(user_id);

        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk.clone()))
            .key("SK", AttributeValue::S(pk))
            .send()
            .await
            .map_err(backend)?;

        result
            .item()
            .map(|item| user_from_item(user_id, item))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> AttributeValue {
        AttributeValue::S(v.to_string())
    }

    #[test]
    fn parses_post_item() {
        let mut item = Item::new();
        item.insert("PK".into(), s("POST#abc"));
        item.insert("SK".into(), s("POST#abc"));
        item.insert("title".into(), s("Hello"));
        item.insert("content".into(), s("Body"));
        item.insert("author_id".into(), s("user-1"));
        item.insert("created_at".into(), s("2024-06-20T10:30:00+00:00"));
        item.insert("updated_at".into(), s("2024-06-21T10:30:00.123456789+00:00"));

        let post = post_from_item(&item).unwrap();
        assert_eq!(post.post_id, "abc");
        assert_eq!(post.author_id, "user-1");
        assert!(post.updated_at > post.created_at);
        assert_eq!(post.updated_at.timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn missing_attribute_is_corrupt() {
        let mut item = Item::new();
        item.insert("PK".into(), s("POST#abc"));
        item.insert("title".into(), s("Hello"));

        match post_from_item(&item) {
            Err(StoreError::Corrupt { key, reason }) => {
                assert_eq!(key, "POST#abc");
                assert!(reason.contains("content"));
            }
            other => panic!("expected corrupt record, got {:?}", other),
        }
    }

    #[test]
    fn timestamps_round_trip_through_rfc3339() {
        let now = Utc::now();
        let mut item = Item::new();
        item.insert("name".into(), s("Alice"));
        item.insert("email".into(), s("alice@example.com"));
        item.insert("created_at".into(), AttributeValue::S(now.to_rfc3339()));

        let user = user_from_item("u1", &item).unwrap();
        assert_eq!(user.created_at, now);
        assert_eq!(user.user_id, "u1");
    }
}
