use std::env;

use taskmaster_atoms::tasks::TableLayout;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Runtime configuration read once at cold start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub table_name: String,
    pub user_pool_id: String,
    pub layout: TableLayout,
    pub cors_origin: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let table_name = required("TABLE_NAME")?;
        let user_pool_id = required("COGNITO_USER_POOL_ID")?;
        let well_formed = matches!(
            user_pool_id.split_once('_'),
            Some((region, id)) if !region.is_empty() && !id.is_empty()
        );
        if !well_formed {
            return Err(ConfigError::Invalid {
                name: "COGNITO_USER_POOL_ID",
                value: user_pool_id,
            });
        }

        let layout = match lookup("TASK_TABLE_LAYOUT").as_deref().map(str::trim) {
            None | Some("") | Some("per-owner") => TableLayout::PerOwner,
            Some("flat") => TableLayout::Flat {
                owner_index: required("OWNER_INDEX_NAME")?,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "TASK_TABLE_LAYOUT",
                    value: other.to_string(),
                })
            }
        };

        let cors_origin = lookup("CORS_ALLOWED_ORIGIN")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "*".to_string());

        Ok(Config {
            table_name,
            user_pool_id,
            layout,
            cors_origin,
        })
    }

    /// `iss` claim carried by access tokens of the configured pool. Pool ids
    /// are `<region>_<id>`.
    pub fn token_issuer(&self) -> String {
        let region = self
            .user_pool_id
            .split_once('_')
            .map_or("", |(region, _)| region);
        format!(
            "https://cognito-idp.{}.amazonaws.com/{}",
            region, self.user_pool_id
        )
    }
}
