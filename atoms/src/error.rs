use lambda_http::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single offending field in an inbound payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Payload rejected by a validator. Always carries at least one field entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", summarize(.fields))]
pub struct ValidationError {
    pub fields: Vec<FieldError>,
}

impl ValidationError {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            fields: vec![FieldError::new(field, message)],
        }
    }

    /// Does any entry reference `field`?
    pub fn mentions(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.field == field)
    }
}

fn summarize(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failures of the task gateway and handlers.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Missing record, or a record owned by someone else. The two are never
    /// distinguished.
    #[error("Task not found")]
    NotFound,

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl TaskError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TaskError::Validation(_) => StatusCode::BAD_REQUEST,
            TaskError::NotFound => StatusCode::NOT_FOUND,
            TaskError::StorageUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            TaskError::Validation(_) => "ValidationError",
            TaskError::NotFound => "NotFound",
            TaskError::StorageUnavailable(_) => "StorageUnavailable",
        }
    }
}

/// Failures of the user profile gateway and handlers.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("User not found")]
    NotFound,

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl UserError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UserError::Validation(_) => StatusCode::BAD_REQUEST,
            UserError::NotFound => StatusCode::NOT_FOUND,
            UserError::StorageUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            UserError::Validation(_) => "ValidationError",
            UserError::NotFound => "NotFound",
            UserError::StorageUnavailable(_) => "StorageUnavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        let validation = TaskError::from(ValidationError::single("title", "Title is required"));
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(TaskError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            TaskError::StorageUnavailable("throttled".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(UserError::NotFound.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_display_lists_fields() {
        let err = ValidationError {
            fields: vec![
                FieldError::new("title", "Title is required"),
                FieldError::new("status", "must be one of To Do, In Progress, Completed"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "title: Title is required; status: must be one of To Do, In Progress, Completed"
        );
        assert!(err.mentions("status"));
        assert!(!err.mentions("dueDate"));
    }
}
