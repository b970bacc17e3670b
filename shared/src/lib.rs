pub mod auth;
pub mod config;
pub mod state;

pub use auth::{AuthError, CognitoIdentity, Identity, IdentityResolver, StaticIdentity};
pub use config::{Config, ConfigError};
pub use state::AppState;
