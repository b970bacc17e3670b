use lambda_http::{http::StatusCode, Body, Error, Response};

use super::service::TaskStore;
use super::validate::{parse_body, validate_create, validate_update};
use crate::error::TaskError;
use crate::response;

/// HTTP Handler: GET /api/tasks
pub async fn list_tasks(store: &dyn TaskStore, owner_id: &str) -> Result<Response<Body>, Error> {
    match store.list_by_owner(owner_id).await {
        Ok(mut tasks) => {
            // newest first
            tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            response::json(StatusCode::OK, &tasks)
        }
        Err(e) => task_error_response(&e),
    }
}

/// HTTP Handler: POST /api/tasks
pub async fn create_task(
    store: &dyn TaskStore,
    owner_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let new = match parse_body(body).and_then(|payload| validate_create(&payload)) {
        Ok(new) => new,
        Err(e) => return task_error_response(&e.into()),
    };

    match store.create(owner_id, new).await {
        Ok(task) => {
            tracing::info!(task_id = %task.id, "Task created");
            response::json(StatusCode::CREATED, &task)
        }
        Err(e) => task_error_response(&e),
    }
}

/// HTTP Handler: GET /api/tasks/{id}
pub async fn get_task(
    store: &dyn TaskStore,
    owner_id: &str,
    task_id: &str,
) -> Result<Response<Body>, Error> {
    match store.get(owner_id, task_id).await {
        Ok(task) => response::json(StatusCode::OK, &task),
        Err(e) => task_error_response(&e),
    }
}

/// HTTP Handler: PUT /api/tasks/{id}
pub async fn update_task(
    store: &dyn TaskStore,
    owner_id: &str,
    task_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let patch = match parse_body(body).and_then(|payload| validate_update(&payload)) {
        Ok(patch) => patch,
        Err(e) => return task_error_response(&e.into()),
    };

    match store.update(owner_id, task_id, patch).await {
        Ok(_) => response::message(StatusCode::OK, "Task updated successfully"),
        Err(e) => task_error_response(&e),
    }
}

/// HTTP Handler: DELETE /api/tasks/{id}
pub async fn delete_task(
    store: &dyn TaskStore,
    owner_id: &str,
    task_id: &str,
) -> Result<Response<Body>, Error> {
    match store.delete(owner_id, task_id).await {
        Ok(()) => response::message(StatusCode::OK, "Task deleted successfully"),
        Err(e) => task_error_response(&e),
    }
}

pub fn task_error_response(err: &TaskError) -> Result<Response<Body>, Error> {
    match err {
        TaskError::Validation(v) => response::error(
            err.status_code(),
            err.code(),
            v.to_string(),
            Some(&v.fields),
        ),
        TaskError::NotFound => response::error(
            err.status_code(),
            err.code(),
            "Task not found or not owned by user",
            None,
        ),
        TaskError::StorageUnavailable(detail) => {
            tracing::error!("Task storage failure: {}", detail);
            response::error(
                err.status_code(),
                err.code(),
                "Task storage is unavailable, please try again",
                None,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::memory::InMemoryTaskStore;
    use crate::tasks::model::{NewTask, TaskStatus};
    use serde_json::{json, Value};

    fn body_json(resp: &Response<Body>) -> Value {
        serde_json::from_slice(resp.body()).unwrap()
    }

    #[tokio::test]
    async fn create_returns_server_assigned_fields() {
        let store = InMemoryTaskStore::new();
        let body = json!({ "title": "Write spec", "dueDate": null }).to_string();
        let resp = create_task(&store, "alice", body.as_bytes()).await.unwrap();

        assert_eq!(resp.status(), StatusCode::CREATED);
        let task = body_json(&resp);
        assert!(task["id"].as_str().is_some_and(|id| !id.is_empty()));
        assert!(task["createdAt"].is_string());
        assert_eq!(task["status"], "To Do");
        assert_eq!(task["ownerId"], "alice");
    }

    #[tokio::test]
    async fn create_with_empty_title_is_a_field_error() {
        let store = InMemoryTaskStore::new();
        let resp = create_task(&store, "alice", br#"{"title": ""}"#).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(&resp);
        assert_eq!(body["error"], "ValidationError");
        assert_eq!(body["details"][0]["field"], "title");
        assert!(store.list_by_owner("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_of_foreign_task_is_not_found() {
        let store = InMemoryTaskStore::new();
        let task = store.create("alice", NewTask::titled("mine")).await.unwrap();
        let resp = update_task(&store, "bob", &task.id, br#"{"status": "Completed"}"#)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            store.get("alice", &task.id).await.unwrap().status,
            TaskStatus::ToDo
        );
    }

    #[tokio::test]
    async fn validation_runs_before_ownership() {
        let store = InMemoryTaskStore::new();
        let resp = update_task(&store, "bob", "whatever", br#"{"status": "Blocked"}"#)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn storage_failure_is_500() {
        let store = InMemoryTaskStore::new();
        store.set_unavailable(true);
        let resp = list_tasks(&store, "alice").await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(&resp)["error"], "StorageUnavailable");
    }
}
