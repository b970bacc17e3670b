//! In-memory task store for tests and local runs.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::model::{NewTask, Task, TaskPatch};
use super::service::TaskStore;
use crate::error::TaskError;

#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<Vec<Task>>,
    unavailable: AtomicBool,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every operation fails with `StorageUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), TaskError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(TaskError::StorageUnavailable("in-memory store marked unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, owner_id: &str, new: NewTask) -> Result<Task, TaskError> {
        self.check_available()?;
        let task = Task::from_new(uuid::Uuid::new_v4().to_string(), owner_id, Utc::now(), new);
        self.tasks.write().await.push(task.clone());
        Ok(task)
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Task>, TaskError> {
        self.check_available()?;
        Ok(self
            .tasks
            .read()
            .await
            .iter()
            .filter(|t| t.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn get(&self, owner_id: &str, task_id: &str) -> Result<Task, TaskError> {
        self.check_available()?;
        self.tasks
            .read()
            .await
            .iter()
            .find(|t| t.id == task_id && t.owner_id == owner_id)
            .cloned()
            .ok_or(TaskError::NotFound)
    }

    async fn update(
        &self,
        owner_id: &str,
        task_id: &str,
        patch: TaskPatch,
    ) -> Result<Task, TaskError> {
        self.check_available()?;
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == task_id && t.owner_id == owner_id)
            .ok_or(TaskError::NotFound)?;
        patch.apply_to(task);
        Ok(task.clone())
    }

    async fn delete(&self, owner_id: &str, task_id: &str) -> Result<(), TaskError> {
        self.check_available()?;
        let mut tasks = self.tasks.write().await;
        let index = tasks
            .iter()
            .position(|t| t.id == task_id && t.owner_id == owner_id)
            .ok_or(TaskError::NotFound)?;
        tasks.remove(index);
        Ok(())
    }
}
