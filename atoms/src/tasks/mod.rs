pub mod http;
pub mod memory;
pub mod model;
pub mod service;
pub mod validate;

pub use memory::InMemoryTaskStore;
pub use model::{NewTask, Task, TaskPatch, TaskStatus};
pub use service::{DynamoTaskStore, TableLayout, TaskStore};
