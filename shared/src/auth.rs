//! Identity resolution: bearer extraction plus verification against the
//! identity service.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use lambda_http::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    Body, Error, Response,
};
use taskmaster_atoms::{response, users::VerifiedClaims};
use thiserror::Error;

/// Verified caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub owner_id: String,
    pub username: Option<String>,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Identity {
            owner_id: owner_id.into(),
            username: None,
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn claims(&self) -> VerifiedClaims<'_> {
        VerifiedClaims {
            username: self.username.as_deref(),
            email: self.email.as_deref(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing, malformed, expired, revoked or otherwise rejected credential.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("identity service unavailable: {0}")]
    Unavailable(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AuthError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AuthError::Unauthenticated("missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| AuthError::Unauthenticated("Authorization header is not ASCII".to_string()))?;

    match value.trim().split_once(' ') {
        Some((scheme, token))
            if scheme.eq_ignore_ascii_case("bearer")
                && !token.trim().is_empty()
                && !token.trim().contains(char::is_whitespace) =>
        {
            Ok(token.trim())
        }
        _ => Err(AuthError::Unauthenticated(
            "Authorization header is not a bearer token".to_string(),
        )),
    }
}

pub async fn authenticate(
    resolver: &dyn IdentityResolver,
    headers: &HeaderMap,
) -> Result<Identity, AuthError> {
    let token = bearer_token(headers)?;
    match resolver.verify(token).await {
        Ok(identity) => Ok(identity),
        Err(e @ AuthError::Unauthenticated(_)) => {
            tracing::warn!("Rejected credential: {}", e);
            Err(e)
        }
        Err(e) => {
            tracing::error!("Token verification failed: {}", e);
            Err(e)
        }
    }
}

pub fn auth_error_response(err: &AuthError) -> Result<Response<Body>, Error> {
    match err {
        AuthError::Unauthenticated(_) => {
            let mut resp =
                response::error(err.status_code(), "Unauthorized", "Unauthorized", None)?;
            resp.headers_mut().insert(
                "WWW-Authenticate",
                lambda_http::http::HeaderValue::from_static("Bearer"),
            );
            Ok(resp)
        }
        AuthError::Unavailable(_) => response::error(
            err.status_code(),
            "IdentityUnavailable",
            "Could not verify credentials, please try again",
            None,
        ),
    }
}

/// `iss` claim of a JWT, read without checking the signature.
fn unverified_issuer(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims.get("iss")?.as_str().map(str::to_string)
}

/// Verifies Cognito access tokens with `GetUser`, accepting only tokens
/// issued by the configured user pool.
pub struct CognitoIdentity {
    client: CognitoClient,
    issuer: String,
}

impl CognitoIdentity {
    pub fn new(client: CognitoClient, issuer: impl Into<String>) -> Self {
        Self {
            client,
            issuer: issuer.into(),
        }
    }
}

#[async_trait]
impl IdentityResolver for CognitoIdentity {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        // GetUser accepts tokens from any pool in the region.
        match unverified_issuer(token) {
            Some(issuer) if issuer == self.issuer => {}
            Some(issuer) => {
                return Err(AuthError::Unauthenticated(format!(
                    "token issued by foreign pool {}",
                    issuer
                )))
            }
            None => {
                return Err(AuthError::Unauthenticated(
                    "token is not a JWT with an issuer".to_string(),
                ))
            }
        }

        let output = self
            .client
            .get_user()
            .access_token(token)
            .send()
            .await
            .map_err(|e| {
                let rejected = e
                    .as_service_error()
                    .map(|se| {
                        se.is_not_authorized_exception()
                            || se.is_user_not_found_exception()
                            || se.is_user_not_confirmed_exception()
                            || se.is_password_reset_required_exception()
                    })
                    .unwrap_or(false);
                if rejected {
                    AuthError::Unauthenticated(format!("Cognito rejected token: {}", e))
                } else {
                    AuthError::Unavailable(format!("Cognito get_user error: {}", e))
                }
            })?;

        let attributes: HashMap<&str, &str> = output
            .user_attributes()
            .iter()
            .filter_map(|attr| attr.value().map(|value| (attr.name(), value)))
            .collect();

        let username = output.username().to_string();
        let owner_id = attributes
            .get("sub")
            .map(|sub| sub.to_string())
            .unwrap_or_else(|| username.clone());

        Ok(Identity {
            owner_id,
            username: attributes
                .get("preferred_username")
                .map(|name| name.to_string())
                .or(Some(username)),
            email: attributes.get("email").map(|email| email.to_string()),
        })
    }
}

/// Fixed token table, for tests and local runs.
#[derive(Debug, Default, Clone)]
pub struct StaticIdentity {
    tokens: HashMap<String, Identity>,
}

impl StaticIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.tokens.insert(token.into(), identity);
        self
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentity {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::Unauthenticated("unknown token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lambda_http::http::HeaderValue;
    use rstest::rstest;

    fn headers(value: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = value {
            headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        }
        headers
    }

    #[rstest]
    #[case("Bearer abc123", "abc123")]
    #[case("bearer abc123", "abc123")]
    #[case("Bearer   abc123  ", "abc123")]
    fn extracts_bearer_token(#[case] header: &'static str, #[case] expected: &str) {
        assert_eq!(bearer_token(&headers(Some(header))).unwrap(), expected);
    }

    #[rstest]
    #[case(None)]
    #[case(Some("Bearer"))]
    #[case(Some("Bearer "))]
    #[case(Some("Basic dXNlcjpwYXNz"))]
    #[case(Some("abc123"))]
    #[case(Some("Bearer two tokens"))]
    fn rejects_malformed_headers(#[case] header: Option<&'static str>) {
        assert!(matches!(
            bearer_token(&headers(header)),
            Err(AuthError::Unauthenticated(_))
        ));
    }

    #[tokio::test]
    async fn static_identity_resolves_known_tokens() {
        let resolver = StaticIdentity::new().with_token("t-alice", Identity::new("alice"));
        let identity = authenticate(&resolver, &headers(Some("Bearer t-alice")))
            .await
            .unwrap();
        assert_eq!(identity.owner_id, "alice");

        let err = authenticate(&resolver, &headers(Some("Bearer t-eve")))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    const POOL_ISSUER: &str = "https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_home";

    fn jwt(claims: serde_json::Value) -> String {
        format!(
            "eyJhbGciOiJSUzI1NiJ9.{}.c2ln",
            URL_SAFE_NO_PAD.encode(claims.to_string())
        )
    }

    fn offline_cognito() -> CognitoIdentity {
        use aws_sdk_cognitoidentityprovider::config::{BehaviorVersion, Region};
        let conf = aws_sdk_cognitoidentityprovider::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("eu-west-1"))
            .build();
        CognitoIdentity::new(CognitoClient::from_conf(conf), POOL_ISSUER)
    }

    #[test]
    fn reads_issuer_claim() {
        let token = jwt(serde_json::json!({ "iss": POOL_ISSUER, "sub": "alice" }));
        assert_eq!(unverified_issuer(&token).as_deref(), Some(POOL_ISSUER));
        assert_eq!(unverified_issuer("opaque-token"), None);
        assert_eq!(unverified_issuer(&jwt(serde_json::json!({ "sub": "alice" }))), None);
    }

    #[rstest]
    #[case(jwt(serde_json::json!({
        "iss": "https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_other",
        "sub": "mallory",
    })))]
    #[case("not-a-jwt".to_string())]
    #[tokio::test]
    async fn cognito_rejects_tokens_from_other_pools(#[case] token: String) {
        let err = offline_cognito().verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated(_)));
        assert_eq!(
            auth_error_response(&err).unwrap().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn unauthorized_response_advertises_bearer() {
        let resp =
            auth_error_response(&AuthError::Unauthenticated("missing".into())).unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers().get("WWW-Authenticate").unwrap(), "Bearer");
    }
}
