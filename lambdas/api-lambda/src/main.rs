use std::sync::Arc;

use lambda_http::{run, service_fn, tracing, Error};
use taskmaster_shared::{AppState, Config};

mod http_handler;
use http_handler::function_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    // Missing configuration fails the cold start.
    let config = Config::from_env()?;
    tracing::info!(
        table = %config.table_name,
        user_pool = %config.user_pool_id,
        layout = ?config.layout,
        "TaskMaster API configuration loaded"
    );

    let state = Arc::new(AppState::from_config(&config).await);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { function_handler(event, state).await }
    }))
    .await
}
