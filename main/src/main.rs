use std::sync::Arc;

use api_router::{api_routes_v1, api_state::ApiState};
use axum::Router;
use common::{
    storage::{db::SurrealDbClient, store::StorageManager},
    utils::{config::get_config, embedding::EmbeddingProvider},
};
use ingestion_pipeline::{IngestionPipeline, OcrEngine};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config
    let config = get_config()?;

    let db = Arc::new(
        SurrealDbClient::new(
            &config.surrealdb_address,
            &config.surrealdb_username,
            &config.surrealdb_password,
            &config.surrealdb_namespace,
            &config.surrealdb_database,
        )
        .await?,
    );

    // Fail fast when no embedding credential is configured; the vector index
    // dimension below depends on the resolved provider.
    let embedding_provider = Arc::new(EmbeddingProvider::from_config(&config)?);
    info!(
        embedding_backend = embedding_provider.backend_label(),
        embedding_dimension = embedding_provider.dimension(),
        "Embedding provider initialized"
    );

    db.ensure_initialized(embedding_provider.dimension()).await?;

    let storage = StorageManager::new(&config).await?;

    let ocr = OcrEngine::from_config(&config);
    match &ocr {
        Some(engine) => info!(ocr_engine = engine.label(), "OCR engine initialized"),
        None => warn!("No OCR engine configured; image uploads will be rejected"),
    }

    let pipeline = IngestionPipeline::new(db.clone(), storage, embedding_provider, ocr);
    let api_state = ApiState::new(db, config.clone(), pipeline);

    // Create Axum router
    let app = Router::new()
        .nest("/api/v1", api_routes_v1(&api_state))
        .with_state(api_state);

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
