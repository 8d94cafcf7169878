use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use embedchat::core::config::{AppPaths, ConfigService};
use embedchat::core::logging;
use embedchat::server;
use embedchat::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    let paths = Arc::new(AppPaths::new());
    let config = ConfigService::new(paths.clone())
        .load_config()
        .context("Failed to load configuration")?;
    logging::init(&paths, &config.logging).context("Failed to initialize logging")?;

    match dotenv {
        Ok(path) => tracing::info!("Loaded environment from {}", path.display()),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!("Failed to load .env: {}", err),
    }

    let state = AppState::initialize(paths, config).await?;
    tracing::info!(
        "Project root: {}, data dir: {}",
        state.paths.project_root.display(),
        state.paths.user_data_dir.display()
    );

    let bind_addr = state.config.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    println!("EMBEDCHAT_URL=http://{}", addr);
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
