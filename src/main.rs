use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{fmt, EnvFilter};

use content_studio::{
    config::StudioConfig,
    creative::CreativeStudio,
    gemini::{GeminiClient, GenerationService},
    history::HistoryStore,
    routes::{router, AppState},
    storage::FileStore,
    studio::Studio,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = StudioConfig::from_env();
    tracing::info!("Using API key: {}...", config.redacted_key());
    if config.is_demo() {
        tracing::info!("No GEMINI_API_KEY set, running in demo mode");
    }

    let backend = FileStore::new(&config.data_dir)
        .with_context(|| format!("creating data dir {:?}", config.data_dir))?;
    let history = HistoryStore::load(Arc::new(backend));
    let service: Arc<dyn GenerationService> = Arc::new(GeminiClient::new(&config));

    let state = AppState {
        studio: Arc::new(Studio::new(service.clone(), history)),
        creative: Arc::new(CreativeStudio::new(service)),
        export_dir: config.data_dir.join("exports"),
    };

    let app = router(state).layer(
        ServiceBuilder::new().layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        ),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await.context("binding listener")?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down");
        })
        .await?;
    Ok(())
}
