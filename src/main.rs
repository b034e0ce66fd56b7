use std::path::Path;

use tracing_subscriber::EnvFilter;

use polaris_backend::app::app;
use polaris_backend::config::config;
use polaris_backend::database::Backend;
use polaris_backend::handlers::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up POLARIS_DB_PATH, APP_ENV, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config();
    tracing::info!("Starting Polaris backend in {:?} mode", config.environment);

    let backend = Backend::open(config).await?;

    if let Some(csv) = config.api.default_csv.as_deref() {
        if Path::new(csv).exists() {
            match backend.loader().load_path(csv).await {
                Ok(rows) => tracing::info!("Loaded default CSV {} ({} rows)", csv, rows),
                Err(e) => tracing::warn!("Could not load default CSV {}: {}", csv, e),
            }
        } else {
            tracing::debug!("Default CSV {} not present, starting with existing store", csv);
        }
    }

    let router = app(AppState::new(backend.clone()), &config.api);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Polaris backend listening on http://{}", bind_addr);

    axum::serve(listener, router).await?;
    backend.store().close().await;
    Ok(())
}
