use taskmaster_atoms::users::User;

use crate::api::ClientError;

/// Authentication context for one signed-in session. Created at sign-in,
/// passed explicitly to everything that talks to the API, and consumed by
/// [`Session::sign_out`].
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    profile: Option<User>,
}

impl Session {
    pub fn start(token: impl Into<String>) -> Result<Self, ClientError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ClientError::Unauthenticated);
        }
        Ok(Session {
            token: token.trim().to_string(),
            profile: None,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn profile(&self) -> Option<&User> {
        self.profile.as_ref()
    }

    pub fn set_profile(&mut self, profile: User) {
        self.profile = Some(profile);
    }

    /// Ends the session. The token is dropped with it.
    pub fn sign_out(self) {
        tracing::debug!("Session ended");
    }
}
