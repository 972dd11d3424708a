use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_dynamodb::Client as DynamoClient;
use blog_shared::config::{Backend, Config};
use blog_shared::identity::CognitoIdentity;
use blog_shared::storage::DynamoStore;
use blog_shared::AppState;
use lambda_http::{run, service_fn, tracing, Error, Request};
use std::sync::Arc;

mod http_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let config = Config::from_env()?;

    // Initialize backends once at startup
    let state = match (config.backend, config.cognito) {
        (Backend::DynamoDb, Some(cognito)) => {
            let aws_config = aws_config::load_from_env().await;
            let store = Arc::new(DynamoStore::new(
                DynamoClient::new(&aws_config),
                config.table_name.clone(),
            ));
            tracing::info!("Using DynamoDB table {}", config.table_name);
            AppState::new(
                store.clone(),
                store,
                Arc::new(CognitoIdentity::new(CognitoClient::new(&aws_config), cognito)),
            )
        }
        (Backend::DynamoDb, None) => {
            return Err("COGNITO_CLIENT_ID must be set".into());
        }
        (Backend::Memory, _) => {
            tracing::warn!("Using in-memory backend; data does not survive a cold start");
            AppState::in_memory(config.token_ttl)
        }
    };

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { http_handler::function_handler(event, state).await }
    }))
    .await
}
