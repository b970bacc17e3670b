//! JSON response builders shared by every handler.
//!
//! CORS headers are not set here; the router stamps them on the way out.

use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::Serialize;

use crate::error::FieldError;

#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub error: &'a str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<&'a [FieldError]>,
}

pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_string(value)?.into())
        .map_err(Box::new)?)
}

/// `{"message": "..."}` confirmation body.
pub fn message(status: StatusCode, message: &str) -> Result<Response<Body>, Error> {
    json(status, &serde_json::json!({ "message": message }))
}

pub fn error(
    status: StatusCode,
    code: &str,
    message: impl Into<String>,
    details: Option<&[FieldError]>,
) -> Result<Response<Body>, Error> {
    json(
        status,
        &ErrorBody {
            error: code,
            message: message.into(),
            details,
        },
    )
}

pub fn not_found() -> Result<Response<Body>, Error> {
    error(StatusCode::NOT_FOUND, "NotFound", "Not found", None)
}

pub fn method_not_allowed() -> Result<Response<Body>, Error> {
    error(
        StatusCode::METHOD_NOT_ALLOWED,
        "MethodNotAllowed",
        "Method not allowed",
        None,
    )
}
