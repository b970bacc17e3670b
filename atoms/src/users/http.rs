use chrono::Utc;
use lambda_http::{http::StatusCode, Body, Error, Response};

use super::model::{RegisterUserPayload, User, VerifiedClaims};
use super::service::{username_from_email, UserStore};
use crate::error::{UserError, ValidationError};
use crate::response;

/// HTTP Handler: POST /api/users
///
/// Creates the caller's profile once. The verified email claim wins over the
/// body. The username comes from the body, then the claim, then the email.
pub async fn register_user(
    store: &dyn UserStore,
    user_id: &str,
    claims: VerifiedClaims<'_>,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: RegisterUserPayload = if body.iter().all(u8::is_ascii_whitespace) {
        RegisterUserPayload::default()
    } else {
        match serde_json::from_slice(body) {
            Ok(payload) => payload,
            Err(e) => {
                return user_error_response(&UserError::Validation(ValidationError::single(
                    "body",
                    format!("Request body is not valid JSON: {}", e),
                )))
            }
        }
    };

    let email = claims
        .email
        .map(str::to_string)
        .or(payload.email)
        .filter(|email| email.contains('@'));
    let Some(email) = email else {
        return user_error_response(&UserError::Validation(ValidationError::single(
            "email",
            "Please provide a valid email address",
        )));
    };

    let username = payload
        .username
        .filter(|name| !name.trim().is_empty())
        .map(|name| name.trim().to_string())
        .or_else(|| claims.username.map(str::to_string))
        .unwrap_or_else(|| username_from_email(&email));

    let user = User {
        id: user_id.to_string(),
        username,
        email,
        created_at: Utc::now(),
    };

    match store.register(user).await {
        Ok((user, true)) => {
            tracing::info!(user_id = %user.id, "User profile created");
            response::json(StatusCode::CREATED, &user)
        }
        Ok((user, false)) => response::json(StatusCode::OK, &user),
        Err(e) => user_error_response(&e),
    }
}

/// HTTP Handler: GET /api/users/me
pub async fn get_me(store: &dyn UserStore, user_id: &str) -> Result<Response<Body>, Error> {
    match store.get(user_id).await {
        Ok(user) => response::json(StatusCode::OK, &user),
        Err(e) => user_error_response(&e),
    }
}

pub fn user_error_response(err: &UserError) -> Result<Response<Body>, Error> {
    match err {
        UserError::Validation(v) => {
            response::error(err.status_code(), err.code(), v.to_string(), Some(&v.fields))
        }
        UserError::NotFound => response::error(err.status_code(), err.code(), "User not found", None),
        UserError::StorageUnavailable(detail) => {
            tracing::error!("User storage failure: {}", detail);
            response::error(
                err.status_code(),
                err.code(),
                "User storage is unavailable, please try again",
                None,
            )
        }
    }
}
