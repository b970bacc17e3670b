//! Domain atoms for TaskMaster: records, validation, persistence gateways and
//! the HTTP handlers that sit directly on top of them.
//!
//! Atoms take their clients and owner ids as arguments; nothing in here reads
//! global state or environment variables.

pub mod error;
pub mod response;
pub mod tasks;
pub mod users;

pub use error::{FieldError, TaskError, UserError, ValidationError};
