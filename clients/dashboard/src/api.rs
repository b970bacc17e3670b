use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use taskmaster_atoms::tasks::{Task, TaskStatus};
use taskmaster_atoms::users::User;
use taskmaster_atoms::FieldError;
use thiserror::Error;

use crate::session::Session;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("You are not signed in, or your session has expired")]
    Unauthenticated,

    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<FieldError>,
    },

    #[error("Task not found")]
    NotFound,

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        TaskDraft {
            title: title.into(),
            description: None,
            status: TaskStatus::default(),
            due_date: None,
        }
    }
}

/// Body of a partial update. Unset fields are left out of the request;
/// `due_date: Some(None)` sends `null` and clears the date.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl TaskChanges {
    pub fn status(status: TaskStatus) -> Self {
        TaskChanges {
            status: Some(status),
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list(&self, session: &Session) -> Result<Vec<Task>, ClientError>;
    async fn create(&self, session: &Session, draft: &TaskDraft) -> Result<Task, ClientError>;
    async fn update(
        &self,
        session: &Session,
        task_id: &str,
        changes: &TaskChanges,
    ) -> Result<(), ClientError>;
    async fn delete(&self, session: &Session, task_id: &str) -> Result<(), ClientError>;
    async fn profile(&self, session: &Session) -> Result<User, ClientError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<FieldError>,
}

/// [`TaskApi`] over the `/api` HTTP surface.
#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTaskApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        HttpTaskApi { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body: Option<ErrorBody> = resp.json().await.ok();
        let message = body.as_ref().map(|b| b.message.clone()).unwrap_or_default();
        tracing::debug!(status = status.as_u16(), %message, "API request failed");

        Err(match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthenticated,
            StatusCode::NOT_FOUND => ClientError::NotFound,
            StatusCode::BAD_REQUEST => ClientError::Validation {
                message,
                details: body.map(|b| b.details).unwrap_or_default(),
            },
            other => ClientError::Server {
                status: other.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn list(&self, session: &Session) -> Result<Vec<Task>, ClientError> {
        let resp = self
            .client
            .get(self.url("/api/tasks"))
            .bearer_auth(session.token())
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    async fn create(&self, session: &Session, draft: &TaskDraft) -> Result<Task, ClientError> {
        let resp = self
            .client
            .post(self.url("/api/tasks"))
            .bearer_auth(session.token())
            .json(draft)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    async fn update(
        &self,
        session: &Session,
        task_id: &str,
        changes: &TaskChanges,
    ) -> Result<(), ClientError> {
        let resp = self
            .client
            .put(self.url(&format!("/api/tasks/{}", task_id)))
            .bearer_auth(session.token())
            .json(changes)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn delete(&self, session: &Session, task_id: &str) -> Result<(), ClientError> {
        let resp = self
            .client
            .delete(self.url(&format!("/api/tasks/{}", task_id)))
            .bearer_auth(session.token())
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn profile(&self, session: &Session) -> Result<User, ClientError> {
        let resp = self
            .client
            .get(self.url("/api/users/me"))
            .bearer_auth(session.token())
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }
}
