use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use clinidesk::api::clinic_api_router;
use clinidesk::config;
use clinidesk::core_state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let data_dir = config::app_data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let db_path = config::database_path();
    let state = Arc::new(AppState::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "database ready");

    let addr = config::bind_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "{} {} listening", config::APP_NAME, config::APP_VERSION);

    axum::serve(listener, clinic_api_router(state)).await?;
    Ok(())
}
