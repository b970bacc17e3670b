use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User profile record, keyed by the owner identifier.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterUserPayload {
    pub username: Option<String>,
    pub email: Option<String>,
}

/// What the identity service vouched for about the caller.
#[derive(Debug, Clone, Default)]
pub struct VerifiedClaims<'a> {
    pub username: Option<&'a str>,
    pub email: Option<&'a str>,
}
