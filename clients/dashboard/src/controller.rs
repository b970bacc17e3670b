use taskmaster_atoms::tasks::{Task, TaskStatus};

use crate::api::{ClientError, TaskApi, TaskChanges, TaskDraft};
use crate::session::Session;
use crate::view::TaskView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Transient user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: String,
}

impl Notice {
    fn success(description: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Success,
            title: "Success".to_string(),
            description: description.into(),
        }
    }

    fn error(description: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Error,
            title: "Error".to_string(),
            description: description.into(),
        }
    }
}

/// View-state controller for one signed-in user.
pub struct Dashboard<A> {
    api: A,
    session: Session,
    view: TaskView,
    notices: Vec<Notice>,
    loading: bool,
}

impl<A: TaskApi> Dashboard<A> {
    pub fn new(api: A, session: Session) -> Self {
        Dashboard {
            api,
            session,
            view: TaskView::new(),
            notices: Vec::new(),
            loading: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn view(&self) -> &TaskView {
        &self.view
    }

    /// Filter and sort controls.
    pub fn view_mut(&mut self) -> &mut TaskView {
        &mut self.view
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub async fn load_profile(&mut self) -> Result<(), ClientError> {
        let profile = self.api.profile(&self.session).await?;
        self.session.set_profile(profile);
        Ok(())
    }

    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        self.loading = true;
        let result = self.api.list(&self.session).await;
        self.loading = false;

        match result {
            Ok(tasks) => {
                tracing::debug!(count = tasks.len(), "Fetched tasks");
                self.view.replace(tasks);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Fetching tasks failed: {}", e);
                self.notices
                    .push(Notice::error("Could not fetch your tasks. Please try again."));
                Err(e)
            }
        }
    }

    /// Once the server accepts the write the call succeeds; a failed refetch
    /// only adds an error notice and leaves the list stale.
    pub async fn create(&mut self, draft: TaskDraft) -> Result<Task, ClientError> {
        match self.api.create(&self.session, &draft).await {
            Ok(task) => {
                self.notices.push(Notice::success("Task has been created."));
                self.refresh_after_write().await;
                Ok(task)
            }
            Err(e) => {
                self.notices.push(Notice::error(describe("create task", &e)));
                Err(e)
            }
        }
    }

    pub async fn edit(&mut self, task_id: &str, changes: TaskChanges) -> Result<(), ClientError> {
        match self.api.update(&self.session, task_id, &changes).await {
            Ok(()) => {
                self.notices.push(Notice::success("Task has been updated."));
                self.refresh_after_write().await;
                Ok(())
            }
            Err(e) => {
                self.notices.push(Notice::error(describe("update task", &e)));
                Err(e)
            }
        }
    }

    async fn refresh_after_write(&mut self) {
        if let Err(e) = self.refresh().await {
            tracing::warn!("Write succeeded but refetch failed: {}", e);
        }
    }

    /// Optimistic: the new status is visible before the server answers and
    /// is reverted if the update fails.
    pub async fn change_status(&mut self, task_id: &str, status: TaskStatus) -> Result<(), ClientError> {
        let Some(pending) = self.view.apply_status(task_id, status) else {
            return Err(ClientError::NotFound);
        };

        match self
            .api
            .update(&self.session, task_id, &TaskChanges::status(status))
            .await
        {
            Ok(()) => {
                self.view.confirm(pending);
                Ok(())
            }
            Err(e) => {
                self.view.rollback(pending);
                self.notices.push(Notice::error("Could not update task status."));
                Err(e)
            }
        }
    }

    /// Optimistic: the task disappears immediately and comes back in its old
    /// position if the delete fails.
    pub async fn delete(&mut self, task_id: &str) -> Result<(), ClientError> {
        let Some(pending) = self.view.apply_removal(task_id) else {
            return Err(ClientError::NotFound);
        };

        match self.api.delete(&self.session, task_id).await {
            Ok(()) => {
                self.view.confirm(pending);
                self.notices.push(Notice::success("Task deleted successfully."));
                Ok(())
            }
            Err(e) => {
                self.view.rollback(pending);
                self.notices.push(Notice::error("Could not delete the task."));
                Err(e)
            }
        }
    }

    /// Tears down the session and all local state, handing back the API.
    pub fn sign_out(self) -> A {
        self.session.sign_out();
        self.api
    }
}

fn describe(action: &str, err: &ClientError) -> String {
    match err {
        ClientError::Validation { details, .. } if !details.is_empty() => {
            let fields: Vec<String> = details
                .iter()
                .map(|d| format!("{}: {}", d.field, d.message))
                .collect();
            format!("Could not {}. {}", action, fields.join("; "))
        }
        _ => format!("Could not {}.", action),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use taskmaster_atoms::users::User;

    /// Canned server: serves `tasks`, optionally failing writes.
    #[derive(Default)]
    struct FakeApi {
        tasks: Mutex<Vec<Task>>,
        fail_writes: AtomicBool,
        fail_lists: AtomicBool,
        list_calls: AtomicUsize,
    }

    impl FakeApi {
        fn with_tasks(tasks: Vec<Task>) -> Self {
            FakeApi {
                tasks: Mutex::new(tasks),
                ..Default::default()
            }
        }

        fn failing(self) -> Self {
            self.fail_writes.store(true, Ordering::SeqCst);
            self
        }

        fn write_result(&self) -> Result<(), ClientError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                Err(ClientError::Server {
                    status: 500,
                    message: "boom".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl TaskApi for FakeApi {
        async fn list(&self, _session: &Session) -> Result<Vec<Task>, ClientError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_lists.load(Ordering::SeqCst) {
                return Err(ClientError::Server {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            Ok(self.tasks.lock().unwrap().clone())
        }

        async fn create(&self, _session: &Session, draft: &TaskDraft) -> Result<Task, ClientError> {
            self.write_result()?;
            let mut tasks = self.tasks.lock().unwrap();
            let created = Task {
                id: format!("t-{}", tasks.len() + 1),
                title: draft.title.clone(),
                description: draft.description.clone(),
                status: draft.status,
                due_date: draft.due_date,
                owner_id: "alice".to_string(),
                created_at: Utc::now(),
            };
            tasks.push(created.clone());
            Ok(created)
        }

        async fn update(
            &self,
            _session: &Session,
            task_id: &str,
            changes: &TaskChanges,
        ) -> Result<(), ClientError> {
            self.write_result()?;
            let mut tasks = self.tasks.lock().unwrap();
            let task = tasks
                .iter_mut()
                .find(|t| t.id == task_id)
                .ok_or(ClientError::NotFound)?;
            if let Some(status) = changes.status {
                task.status = status;
            }
            if let Some(title) = &changes.title {
                task.title = title.clone();
            }
            Ok(())
        }

        async fn delete(&self, _session: &Session, task_id: &str) -> Result<(), ClientError> {
            self.write_result()?;
            self.tasks.lock().unwrap().retain(|t| t.id != task_id);
            Ok(())
        }

        async fn profile(&self, _session: &Session) -> Result<User, ClientError> {
            Ok(User {
                id: "alice".to_string(),
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            })
        }
    }

    fn task(id: &str, status: TaskStatus) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            description: None,
            status,
            due_date: None,
            owner_id: "alice".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        }
    }

    async fn dashboard(api: FakeApi) -> Dashboard<FakeApi> {
        let mut dashboard = Dashboard::new(api, Session::start("token").unwrap());
        dashboard.refresh().await.unwrap();
        dashboard
    }

    #[tokio::test]
    async fn status_change_is_kept_when_server_accepts() {
        let mut dashboard = dashboard(FakeApi::with_tasks(vec![task("a", TaskStatus::ToDo)])).await;
        dashboard.change_status("a", TaskStatus::Completed).await.unwrap();
        assert_eq!(dashboard.view().task("a").unwrap().status, TaskStatus::Completed);
        assert!(dashboard.take_notices().is_empty());
    }

    #[tokio::test]
    async fn status_change_is_reverted_when_server_rejects() {
        let api = FakeApi::with_tasks(vec![task("a", TaskStatus::InProgress)]).failing();
        let mut dashboard = dashboard(api).await;

        let err = dashboard.change_status("a", TaskStatus::Completed).await.unwrap_err();
        assert!(matches!(err, ClientError::Server { status: 500, .. }));
        assert_eq!(dashboard.view().task("a").unwrap().status, TaskStatus::InProgress);

        let notices = dashboard.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::Error);
        assert_eq!(notices[0].description, "Could not update task status.");
    }

    #[tokio::test]
    async fn failed_delete_restores_task() {
        let api = FakeApi::with_tasks(vec![task("a", TaskStatus::ToDo), task("b", TaskStatus::ToDo)]).failing();
        let mut dashboard = dashboard(api).await;

        assert!(dashboard.delete("a").await.is_err());
        let ids: Vec<&str> = dashboard.view().tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[tokio::test]
    async fn delete_removes_locally_and_remotely() {
        let mut dashboard = dashboard(FakeApi::with_tasks(vec![task("a", TaskStatus::ToDo)])).await;
        dashboard.delete("a").await.unwrap();
        assert!(dashboard.view().tasks().is_empty());
        dashboard.refresh().await.unwrap();
        assert!(dashboard.view().tasks().is_empty());
        assert_eq!(dashboard.take_notices()[0].kind, NoticeKind::Success);
    }

    #[tokio::test]
    async fn create_refetches() {
        let mut dashboard = dashboard(FakeApi::default()).await;
        let created = dashboard.create(TaskDraft::new("Write spec")).await.unwrap();
        assert_eq!(dashboard.view().tasks(), [created]);
        let api = dashboard.sign_out();
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn saved_writes_succeed_when_refetch_fails() {
        let mut dashboard = dashboard(FakeApi::with_tasks(vec![task("a", TaskStatus::ToDo)])).await;
        dashboard.api.fail_lists.store(true, Ordering::SeqCst);

        let created = dashboard.create(TaskDraft::new("Write spec")).await.unwrap();
        let changes = TaskChanges {
            title: Some("Renamed".to_string()),
            ..Default::default()
        };
        dashboard.edit("a", changes).await.unwrap();

        let descriptions: Vec<String> = dashboard
            .take_notices()
            .into_iter()
            .map(|n| n.description)
            .collect();
        assert_eq!(
            descriptions,
            [
                "Task has been created.",
                "Could not fetch your tasks. Please try again.",
                "Task has been updated.",
                "Could not fetch your tasks. Please try again.",
            ]
        );

        let api = dashboard.sign_out();
        let stored = api.tasks.lock().unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().any(|t| t.id == created.id));
        assert_eq!(stored[0].title, "Renamed");
    }

    #[tokio::test]
    async fn unknown_task_is_not_sent() {
        let mut dashboard = dashboard(FakeApi::default()).await;
        assert!(matches!(
            dashboard.change_status("ghost", TaskStatus::Completed).await,
            Err(ClientError::NotFound)
        ));
    }

    #[tokio::test]
    async fn profile_lands_in_session() {
        let mut dashboard = dashboard(FakeApi::default()).await;
        dashboard.load_profile().await.unwrap();
        assert_eq!(dashboard.session().profile().unwrap().email, "alice@example.com");
    }
}
