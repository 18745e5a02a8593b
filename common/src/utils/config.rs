use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::utils::embedding::EmbeddingBackend;

#[derive(Clone, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    Memory,
    S3,
}

fn default_storage_kind() -> StorageKind {
    StorageKind::Local
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub surrealdb_address: String,
    pub surrealdb_username: String,
    pub surrealdb_password: String,
    pub surrealdb_namespace: String,
    pub surrealdb_database: String,
    pub http_port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_storage_kind")]
    pub storage: StorageKind,
    /// Endpoint of the s3-compatible bucket service, required for the `s3` backend.
    #[serde(default)]
    pub storage_endpoint: Option<String>,
    #[serde(default)]
    pub storage_bucket: Option<String>,
    #[serde(default = "default_storage_region")]
    pub storage_region: String,
    #[serde(default)]
    pub storage_access_key_id: Option<String>,
    /// Anonymous bucket credential. Used only when no service-role key is set.
    #[serde(default)]
    pub storage_anon_key: Option<String>,
    /// Service-role bucket credential, preferred over the anonymous one.
    #[serde(default)]
    pub storage_service_role_key: Option<String>,
    /// Enables the hosted OCR.Space engine. Absent means the vision fallback is used.
    #[serde(default)]
    pub ocr_space_api_key: Option<String>,
    /// Primary embedding credential (Google Generative Language API).
    #[serde(default)]
    pub google_api_key: Option<String>,
    /// Secondary embedding credential, used only when no Google key is set.
    #[serde(default)]
    pub groq_api_key: Option<String>,
    #[serde(default = "default_groq_base_url")]
    pub groq_base_url: String,
    /// Overrides credential-based provider selection. Mainly useful as `hashed`
    /// for offline runs.
    #[serde(default)]
    pub embedding_backend: Option<EmbeddingBackend>,
    #[serde(default = "default_hashed_dimensions")]
    pub hashed_dimensions: usize,
    #[serde(default = "default_ocr_vision_model")]
    pub ocr_vision_model: String,
    #[serde(default = "default_upload_max_body_bytes")]
    pub upload_max_body_bytes: usize,
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_storage_region() -> String {
    "auto".to_string()
}

fn default_groq_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_hashed_dimensions() -> usize {
    256
}

fn default_ocr_vision_model() -> String {
    "llama-3.2-90b-vision-preview".to_string()
}

fn default_upload_max_body_bytes() -> usize {
    25 * 1024 * 1024
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}

#[cfg(any(test, feature = "test-utils"))]
impl AppConfig {
    /// Configuration for in-process tests: in-memory storage, hashed embeddings.
    pub fn for_tests() -> Self {
        Self {
            surrealdb_address: "mem://".into(),
            surrealdb_username: "test".into(),
            surrealdb_password: "test".into(),
            surrealdb_namespace: "test".into(),
            surrealdb_database: "test".into(),
            http_port: 0,
            data_dir: "/tmp/unused".into(),
            storage: StorageKind::Memory,
            storage_endpoint: None,
            storage_bucket: None,
            storage_region: default_storage_region(),
            storage_access_key_id: None,
            storage_anon_key: None,
            storage_service_role_key: None,
            ocr_space_api_key: None,
            google_api_key: None,
            groq_api_key: None,
            groq_base_url: default_groq_base_url(),
            embedding_backend: Some(EmbeddingBackend::Hashed),
            hashed_dimensions: 16,
            ocr_vision_model: default_ocr_vision_model(),
            upload_max_body_bytes: default_upload_max_body_bytes(),
        }
    }
}
