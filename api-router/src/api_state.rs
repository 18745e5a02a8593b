use std::sync::Arc;

use common::{storage::db::SurrealDbClient, utils::config::AppConfig};
use ingestion_pipeline::IngestionPipeline;

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<SurrealDbClient>,
    pub config: AppConfig,
    pub pipeline: IngestionPipeline,
}

impl ApiState {
    pub fn new(db: Arc<SurrealDbClient>, config: AppConfig, pipeline: IngestionPipeline) -> Self {
        Self {
            db,
            config,
            pipeline,
        }
    }
}
