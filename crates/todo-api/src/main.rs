//! todo-api バイナリのエントリポイント
//! 環境変数から設定を読み込み、HTTP サーバを起動します。

use anyhow::Context;
use infrastructure::{DynamoDbClient, DynamoDbTodoRepository, InMemoryTodoRepository, TodoRepository};
use shared::{
    init_tracing, Config, IdentityProvider, JwtSessionVerifier, RemoteSessionProvider,
    SessionProviderKind, StorageBackend,
};
use std::{net::SocketAddr, sync::Arc};
use todo_api::{app_with_options, AppState, CorsOrigin};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing().map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let config = Config::from_env().context("invalid configuration")?;

    let repo: Arc<dyn TodoRepository> = match config.storage {
        StorageBackend::Memory => {
            info!("Using in-memory todo store");
            Arc::new(InMemoryTodoRepository::new())
        }
        StorageBackend::DynamoDb => {
            info!(table = %config.dynamodb_table, "Using DynamoDB todo store");
            Arc::new(DynamoDbTodoRepository::new(DynamoDbClient::new(&config).await))
        }
    };

    let identity: Arc<dyn IdentityProvider> = match &config.session.provider {
        SessionProviderKind::Jwt { secret } => Arc::new(JwtSessionVerifier::new(secret)),
        SessionProviderKind::Remote { endpoint } => {
            Arc::new(RemoteSessionProvider::new(endpoint.clone()))
        }
    };

    let state = AppState::new(repo, identity, &config.session.cookie_name);
    let cors_origin =
        CorsOrigin::new(&config.cors_allow_origin).context("invalid CORS_ALLOW_ORIGIN")?;
    let router = app_with_options(state, &config.api_base_path, cors_origin);

    let addr = SocketAddr::new(config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, environment = %config.environment, "server starting");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
