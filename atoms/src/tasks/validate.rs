//! Validation of inbound task payloads.
//!
//! Payloads arrive untyped. Every field is checked and all problems are
//! reported together; unknown keys (including `id`, `ownerId` and
//! `createdAt`) are dropped.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};

use super::model::{NewTask, TaskPatch, TaskStatus};
use crate::error::{FieldError, ValidationError};

/// Parses a raw request body as a JSON object.
pub fn parse_body(body: &[u8]) -> Result<Map<String, Value>, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ValidationError::single("body", "Request body is required"));
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ValidationError::single("body", "Request body must be a JSON object")),
        Err(e) => Err(ValidationError::single(
            "body",
            format!("Request body is not valid JSON: {}", e),
        )),
    }
}

pub fn validate_create(payload: &Map<String, Value>) -> Result<NewTask, ValidationError> {
    let mut errors = Vec::new();

    let title = match payload.get("title") {
        None | Some(Value::Null) => {
            errors.push(FieldError::new("title", "Title is required"));
            None
        }
        Some(value) => title_field(value, &mut errors),
    };
    let description = match payload.get("description") {
        None => None,
        Some(value) => description_field(value, &mut errors).flatten(),
    };
    let status = match payload.get("status") {
        None => Some(TaskStatus::default()),
        Some(value) => status_field(value, &mut errors),
    };
    let due_date = match payload.get("dueDate") {
        None => None,
        Some(value) => due_date_field(value, &mut errors).flatten(),
    };

    match (title, status) {
        (Some(title), Some(status)) if errors.is_empty() => Ok(NewTask {
            title,
            description,
            status,
            due_date,
        }),
        _ => Err(ValidationError { fields: errors }),
    }
}

pub fn validate_update(payload: &Map<String, Value>) -> Result<TaskPatch, ValidationError> {
    let mut errors = Vec::new();

    let patch = TaskPatch {
        title: payload
            .get("title")
            .and_then(|value| title_field(value, &mut errors)),
        description: payload
            .get("description")
            .and_then(|value| description_field(value, &mut errors)),
        status: payload
            .get("status")
            .and_then(|value| status_field(value, &mut errors)),
        due_date: payload
            .get("dueDate")
            .and_then(|value| due_date_field(value, &mut errors)),
    };

    if errors.is_empty() {
        Ok(patch)
    } else {
        Err(ValidationError { fields: errors })
    }
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn title_field(value: &Value, errors: &mut Vec<FieldError>) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::String(_) => {
            errors.push(FieldError::new("title", "Title is required"));
            None
        }
        _ => {
            errors.push(FieldError::new("title", "Title must be a string"));
            None
        }
    }
}

// `Some(None)` means "clear".
fn description_field(value: &Value, errors: &mut Vec<FieldError>) -> Option<Option<String>> {
    match value {
        Value::Null => Some(None),
        Value::String(s) if s.trim().is_empty() => Some(None),
        Value::String(s) => Some(Some(s.clone())),
        _ => {
            errors.push(FieldError::new("description", "Description must be a string"));
            None
        }
    }
}

fn status_field(value: &Value, errors: &mut Vec<FieldError>) -> Option<TaskStatus> {
    let status = value.as_str().and_then(TaskStatus::from_label);
    if status.is_none() {
        errors.push(FieldError::new(
            "status",
            "Status must be one of: To Do, In Progress, Completed",
        ));
    }
    status
}

fn due_date_field(
    value: &Value,
    errors: &mut Vec<FieldError>,
) -> Option<Option<DateTime<Utc>>> {
    match value {
        Value::Null => Some(None),
        Value::String(s) => match parse_due_date(s) {
            Some(dt) => Some(Some(dt)),
            None => {
                errors.push(FieldError::new(
                    "dueDate",
                    "Due date must be an ISO 8601 date or date-time",
                ));
                None
            }
        },
        _ => {
            errors.push(FieldError::new(
                "dueDate",
                "Due date must be a string or null",
            ));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn create_defaults_status_and_omits_optionals() {
        let new = validate_create(&object(json!({ "title": "Write spec" }))).unwrap();
        assert_eq!(new, NewTask::titled("Write spec"));
    }

    #[test]
    fn create_normalizes_fields() {
        let new = validate_create(&object(json!({
            "title": "  Write spec ",
            "description": "",
            "status": "In Progress",
            "dueDate": "2024-05-01",
            "ownerId": "mallory",
            "id": "forged"
        })))
        .unwrap();
        assert_eq!(new.title, "Write spec");
        assert_eq!(new.description, None);
        assert_eq!(new.status, TaskStatus::InProgress);
        assert_eq!(
            new.due_date,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );
    }

    #[rstest]
    #[case(json!({}))]
    #[case(json!({ "title": "" }))]
    #[case(json!({ "title": "   " }))]
    #[case(json!({ "title": null }))]
    fn create_requires_a_title(#[case] payload: Value) {
        let err = validate_create(&object(payload)).unwrap_err();
        assert!(err.mentions("title"));
    }

    #[test]
    fn create_reports_every_bad_field() {
        let err = validate_create(&object(json!({
            "title": 7,
            "status": "Blocked",
            "dueDate": "next tuesday",
            "description": false
        })))
        .unwrap_err();
        for field in ["title", "status", "dueDate", "description"] {
            assert!(err.mentions(field), "missing {field}: {err}");
        }
    }

    #[test]
    fn update_distinguishes_absent_from_null() {
        let patch = validate_update(&object(json!({ "status": "Completed" }))).unwrap();
        assert_eq!(patch, TaskPatch::status(TaskStatus::Completed));

        let patch = validate_update(&object(json!({ "dueDate": null }))).unwrap();
        assert_eq!(patch.due_date, Some(None));
        assert_eq!(patch.title, None);
    }

    #[test]
    fn update_accepts_empty_object() {
        assert!(validate_update(&Map::new()).unwrap().is_empty());
    }

    #[rstest]
    #[case(json!({ "title": "" }), "title")]
    #[case(json!({ "status": null }), "status")]
    #[case(json!({ "status": "todo" }), "status")]
    #[case(json!({ "dueDate": 1714521600 }), "dueDate")]
    fn update_rejects_bad_values(#[case] payload: Value, #[case] field: &str) {
        assert!(validate_update(&object(payload)).unwrap_err().mentions(field));
    }

    #[rstest]
    #[case(b"".as_slice())]
    #[case(b"[1, 2]".as_slice())]
    #[case(b"{not json".as_slice())]
    fn body_must_be_an_object(#[case] body: &[u8]) {
        assert!(parse_body(body).unwrap_err().mentions("body"));
    }

    #[test]
    fn due_date_keeps_the_instant() {
        let parsed = parse_due_date("2024-05-01T10:30:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap());
        assert_eq!(parse_due_date("2024-13-01"), None);
    }
}
