use std::sync::Arc;

use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_dynamodb::Client as DynamoClient;
use taskmaster_atoms::tasks::{DynamoTaskStore, InMemoryTaskStore, TaskStore};
use taskmaster_atoms::users::{DynamoUserStore, InMemoryUserStore, UserStore};

use crate::auth::{CognitoIdentity, IdentityResolver};
use crate::config::Config;

/// Everything a request handler needs. Built once per cold start and shared
/// read-only across invocations.
#[derive(Clone)]
pub struct AppState {
    pub tasks: Arc<dyn TaskStore>,
    pub users: Arc<dyn UserStore>,
    pub identity: Arc<dyn IdentityResolver>,
    pub cors_origin: String,
}

impl AppState {
    pub async fn from_config(config: &Config) -> Self {
        let aws_config = aws_config::load_from_env().await;
        let dynamo_client = DynamoClient::new(&aws_config);
        let cognito_client = CognitoClient::new(&aws_config);

        AppState {
            tasks: Arc::new(DynamoTaskStore::new(
                dynamo_client.clone(),
                config.table_name.clone(),
                config.layout.clone(),
            )),
            users: Arc::new(DynamoUserStore::new(dynamo_client, config.table_name.clone())),
            identity: Arc::new(CognitoIdentity::new(
                cognito_client,
                config.token_issuer(),
            )),
            cors_origin: config.cors_origin.clone(),
        }
    }

    /// In-memory stores behind the given resolver.
    pub fn in_memory(identity: Arc<dyn IdentityResolver>) -> Self {
        AppState {
            tasks: Arc::new(InMemoryTaskStore::new()),
            users: Arc::new(InMemoryUserStore::new()),
            identity,
            cors_origin: "*".to_string(),
        }
    }
}
