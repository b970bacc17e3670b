use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::model::User;
use super::service::UserStore;
use crate::error::UserError;

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn register(&self, user: User) -> Result<(User, bool), UserError> {
        let mut users = self.users.write().await;
        if let Some(existing) = users.get(&user.id) {
            return Ok((existing.clone(), false));
        }
        users.insert(user.id.clone(), user.clone());
        Ok((user, true))
    }

    async fn get(&self, user_id: &str) -> Result<User, UserError> {
        self.users
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or(UserError::NotFound)
    }
}
