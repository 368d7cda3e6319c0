use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warble_api::{
    config::{ConfigError, Env},
    server::{self, ServerState},
};
use warble_core::Engine;
use warble_db::{SetupError, client::DbClient};

#[derive(Debug, Error)]
enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Database(#[from] SetupError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "warble_api=debug,warble_core=debug,warble_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=warn"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for ctrl-c, shutting down");
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = Env::load()?;
    let engine_config = env.engine_config()?;

    let pool = warble_db::connect(&env.database_url, env.database_max_connections).await?;
    warble_db::migrate(&pool).await?;

    let store = DbClient::new(pool, env.worker_id, env.process_id);
    let engine = Engine::new(Arc::new(store), engine_config);

    let app = server::routes()
        .layer(TraceLayer::new_for_http())
        .with_state(ServerState { engine });

    let listener = tokio::net::TcpListener::bind(env.socket_address())
        .await
        .map_err(InitError::TcpBind)?;
    info!(address = %env.socket_address(), "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
