//! Client side of TaskMaster: a view-state controller over the task API and
//! the text presentation used by the `taskmaster` terminal client.

pub mod api;
pub mod controller;
pub mod render;
pub mod session;
pub mod view;

pub use api::{ClientError, HttpTaskApi, TaskApi, TaskChanges, TaskDraft};
pub use controller::{Dashboard, Notice, NoticeKind};
pub use session::Session;
pub use view::{PendingChange, SortDirection, TaskView};

pub use taskmaster_atoms::tasks::{Task, TaskStatus};
pub use taskmaster_atoms::users::User;
