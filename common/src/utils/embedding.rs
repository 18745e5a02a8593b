use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    sync::Arc,
};

use anyhow::{anyhow, Result};
use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::AppError, utils::config::AppConfig};

/// Maximum number of inputs sent to a provider in one call.
pub const EMBEDDING_BATCH_SIZE: usize = 100;

const GOOGLE_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const GOOGLE_EMBEDDING_MODEL: &str = "text-embedding-004";
const GOOGLE_EMBEDDING_DIMENSIONS: usize = 768;
const GROQ_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const GROQ_EMBEDDING_DIMENSIONS: usize = 1536;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Google,
    Groq,
    Hashed,
}

/// Embedding strategy resolved once at startup from credential presence.
///
/// The Google API is preferred when its key is configured, the Groq
/// OpenAI-compatible endpoint is the fallback, and the hashed backend exists
/// for offline and test runs. There is no cross-provider retry at request
/// time.
#[derive(Clone, Debug)]
pub struct EmbeddingProvider {
    inner: EmbeddingInner,
}

#[derive(Clone, Debug)]
enum EmbeddingInner {
    Google {
        http: reqwest::Client,
        api_base: String,
        api_key: String,
    },
    OpenAiCompat {
        client: Arc<Client<OpenAIConfig>>,
        model: String,
        dimensions: usize,
    },
    Hashed {
        dimension: usize,
    },
}

impl EmbeddingProvider {
    /// Selects the provider from configuration. Absence of any embedding
    /// credential is a fatal configuration error, detected here rather than
    /// per-request.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let backend = match config.embedding_backend {
            Some(backend) => backend,
            None if config.google_api_key.is_some() => EmbeddingBackend::Google,
            None if config.groq_api_key.is_some() => EmbeddingBackend::Groq,
            None => {
                return Err(AppError::Configuration(
                    "No embeddings provider configured. Set GOOGLE_API_KEY or GROQ_API_KEY."
                        .into(),
                ))
            }
        };

        match backend {
            EmbeddingBackend::Google => {
                let key = config.google_api_key.as_deref().ok_or_else(|| {
                    AppError::Configuration(
                        "embedding_backend = google requires GOOGLE_API_KEY".into(),
                    )
                })?;
                Ok(Self::new_google(key))
            }
            EmbeddingBackend::Groq => {
                let key = config.groq_api_key.as_deref().ok_or_else(|| {
                    AppError::Configuration("embedding_backend = groq requires GROQ_API_KEY".into())
                })?;
                Ok(Self::new_openai_compat(key, &config.groq_base_url))
            }
            EmbeddingBackend::Hashed => Ok(Self::new_hashed(config.hashed_dimensions)),
        }
    }

    pub fn new_google(api_key: &str) -> Self {
        Self {
            inner: EmbeddingInner::Google {
                http: reqwest::Client::new(),
                api_base: GOOGLE_API_BASE.to_string(),
                api_key: api_key.to_string(),
            },
        }
    }

    pub fn new_openai_compat(api_key: &str, api_base: &str) -> Self {
        let client = Client::with_config(
            OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(api_base),
        );
        Self {
            inner: EmbeddingInner::OpenAiCompat {
                client: Arc::new(client),
                model: GROQ_EMBEDDING_MODEL.to_string(),
                dimensions: GROQ_EMBEDDING_DIMENSIONS,
            },
        }
    }

    pub fn new_hashed(dimension: usize) -> Self {
        Self {
            inner: EmbeddingInner::Hashed {
                dimension: dimension.max(1),
            },
        }
    }

    pub fn backend_label(&self) -> &'static str {
        match self.inner {
            EmbeddingInner::Google { .. } => "google",
            EmbeddingInner::OpenAiCompat { .. } => "groq",
            EmbeddingInner::Hashed { .. } => "hashed",
        }
    }

    pub fn dimension(&self) -> usize {
        match &self.inner {
            EmbeddingInner::Google { .. } => GOOGLE_EMBEDDING_DIMENSIONS,
            EmbeddingInner::OpenAiCompat { dimensions, .. } => *dimensions,
            EmbeddingInner::Hashed { dimension } => *dimension,
        }
    }

    /// Embeds all inputs, batched in groups of up to [`EMBEDDING_BATCH_SIZE`]
    /// per provider call. Output order matches input order across batch
    /// boundaries.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for group in texts.chunks(EMBEDDING_BATCH_SIZE) {
            vectors.extend(self.embed_group(group).await?);
        }
        if vectors.len() != texts.len() {
            return Err(anyhow!(
                "embedding provider returned {} vectors for {} inputs",
                vectors.len(),
                texts.len()
            ));
        }
        Ok(vectors)
    }

    async fn embed_group(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        match &self.inner {
            EmbeddingInner::Hashed { dimension } => Ok(texts
                .iter()
                .map(|text| hashed_embedding(text, *dimension))
                .collect()),
            EmbeddingInner::Google {
                http,
                api_base,
                api_key,
            } => {
                let url = format!(
                    "{api_base}/models/{GOOGLE_EMBEDDING_MODEL}:batchEmbedContents?key={api_key}"
                );
                let body = BatchEmbedRequest {
                    requests: texts
                        .iter()
                        .map(|text| EmbedContentRequest {
                            model: "models/text-embedding-004",
                            content: EmbedContent {
                                parts: vec![EmbedPart { text }],
                            },
                        })
                        .collect(),
                };

                let response = http.post(&url).json(&body).send().await?;
                if !response.status().is_success() {
                    let status = response.status();
                    let detail = response.text().await.unwrap_or_default();
                    return Err(anyhow!("Google embeddings failed: {status} {detail}"));
                }

                let parsed: BatchEmbedResponse = response.json().await?;
                debug!(
                    count = parsed.embeddings.len(),
                    "received Google embedding batch"
                );
                Ok(parsed
                    .embeddings
                    .into_iter()
                    .map(|embedding| embedding.values)
                    .collect())
            }
            EmbeddingInner::OpenAiCompat { client, model, .. } => {
                let request = CreateEmbeddingRequestArgs::default()
                    .model(model.clone())
                    .input(texts.to_vec())
                    .build()?;

                let response = client.embeddings().create(request).await?;

                Ok(response
                    .data
                    .into_iter()
                    .map(|item| item.embedding)
                    .collect())
            }
        }
    }
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    model: &'static str,
    content: EmbedContent<'a>,
}

#[derive(Serialize)]
struct EmbedContent<'a> {
    parts: Vec<EmbedPart<'a>>,
}

#[derive(Serialize)]
struct EmbedPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

// Helper functions for hashed embeddings
fn hashed_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let dim = dimension.max(1);
    let mut vector = vec![0.0f32; dim];
    if text.is_empty() {
        return vector;
    }

    for token in tokens(text) {
        let idx = bucket(&token, dim);
        if let Some(value) = vector.get_mut(idx) {
            *value += 1.0;
        }
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }

    vector
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_ascii_lowercase())
}

fn bucket(token: &str, dimension: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    (hasher.finish() as usize) % dimension
}
