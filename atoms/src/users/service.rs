use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use chrono::{DateTime, Utc};

use super::model::User;
use crate::error::UserError;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Stores `user` unless a profile already exists for its id. Returns the
    /// stored profile and whether this call created it.
    async fn register(&self, user: User) -> Result<(User, bool), UserError>;

    async fn get(&self, user_id: &str) -> Result<User, UserError>;
}

pub struct DynamoUserStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoUserStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl UserStore for DynamoUserStore {
    async fn register(&self, user: User) -> Result<(User, bool), UserError> {
        let pk = format!("USER#{}", user.id);

        // PK=SK=USER#<owner>
        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item("PK", AttributeValue::S(pk.clone()))
            .item("SK", AttributeValue::S(pk))
            .item("user_name", AttributeValue::S(user.username.clone()))
            .item("user_email", AttributeValue::S(user.email.clone()))
            .item("user_created_at", AttributeValue::S(user.created_at.to_rfc3339()))
            .condition_expression("attribute_not_exists(PK)")
            .send()
            .await;

        match result {
            Ok(_) => Ok((user, true)),
            Err(e)
                if e.as_service_error()
                    .map(|se| se.is_conditional_check_failed_exception())
                    .unwrap_or(false) =>
            {
                let existing = self.get(&user.id).await?;
                Ok((existing, false))
            }
            Err(e) => {
                tracing::error!("DynamoDB put_item error: {}", e);
                Err(UserError::StorageUnavailable(format!("DynamoDB put_item error: {}", e)))
            }
        }
    }

    async fn get(&self, user_id: &str) -> Result<User, UserError> {
        let pk = format!("USER#{}", user_id);

        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .consistent_read(true)
            .key("PK", AttributeValue::S(pk.clone()))
            .key("SK", AttributeValue::S(pk))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("DynamoDB get_item error: {}", e);
                UserError::StorageUnavailable(format!("DynamoDB get_item error: {}", e))
            })?;

        result
            .item()
            .map(|item| user_from_item(user_id, item))
            .ok_or(UserError::NotFound)
    }
}

fn user_from_item(user_id: &str, item: &HashMap<String, AttributeValue>) -> User {
    let get = |name: &str| {
        item.get(name)
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
    };

    let email = get("user_email").unwrap_or_default();
    let username = get("user_name")
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| username_from_email(&email));

    User {
        id: user_id.to_string(),
        username,
        email,
        created_at: get("user_created_at")
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_default(),
    }
}

/// Local part of an address, or `"User"` when there is nothing usable.
pub fn username_from_email(email: &str) -> String {
    email
        .split('@')
        .next()
        .filter(|local| !local.is_empty())
        .unwrap_or("User")
        .to_string()
}
