// src/bin/api_server.rs

use game_catalog::crypto::token::TokenKeys;
use game_catalog::infra::logging::init_tracing;
use game_catalog::transport;
use game_catalog::{Config, MetadataService, PostgresStore, TrafficSimulator};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env()?;

    // --- Store Initialization ---
    tracing::info!("connecting to Postgres");
    let store = PostgresStore::connect(&config).await?;
    store.ensure_schema().await?;
    let store = Arc::new(store);

    // --- Background Traffic ---
    let simulator =
        TrafficSimulator::new(MetadataService::new(store.clone()), config.traffic.clone());
    let traffic = simulator.spawn();

    // --- API Server Initialization ---
    let tokens = TokenKeys::new(config.jwt_secret.as_bytes(), config.token_ttl);
    let app_state = transport::http::AppState::new(store, tokens);
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = transport::http::create_router(app_state, config.request_timeout)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", transport::http::ApiDoc::openapi()))
        .layer(cors);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr.as_str()).await?;
    tracing::info!(%addr, "API server listening");
    tracing::info!("Swagger UI available at http://localhost:{}/swagger-ui", config.port);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Drain the simulator whatever way the server stopped.
    traffic.shutdown().await;
    tracing::info!("graceful shutdown complete");

    served.map_err(Into::into)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
