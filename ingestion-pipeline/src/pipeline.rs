use std::sync::Arc;

use async_stream::stream;
use bytes::Bytes;
use common::{
    storage::{
        db::SurrealDbClient,
        store::StorageManager,
        types::{document::Document, document_chunk::DocumentChunk},
    },
    utils::embedding::EmbeddingProvider,
};
use futures::Stream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{event::StageEvent, extraction, extraction::ocr::OcrEngine};

/// A file as received from the upload endpoint, fully buffered.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    /// Content type as declared by the uploader, if any. Browsers lie about
    /// this often enough that extension checks back it up.
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, content_type: Option<String>, bytes: Bytes) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            bytes,
        }
    }

    /// Lowercased file extension, `"bin"` when the name has none.
    pub fn extension(&self) -> String {
        self.filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_else(|| "bin".to_string())
    }

    /// The declared content type, or a guess from the filename, or
    /// `application/octet-stream`.
    pub fn content_type_or_guess(&self) -> String {
        match &self.content_type {
            Some(declared) if !declared.is_empty() => declared.clone(),
            _ => mime_guess::from_path(&self.filename)
                .first_raw()
                .unwrap_or("application/octet-stream")
                .to_string(),
        }
    }
}

/// Runs an upload through storage, extraction, chunking, embedding and
/// persistence, reporting progress as a stream of [`StageEvent`]s.
///
/// The pipeline is deliberately not transactional: once the document row is
/// inserted it stays, even if chunk persistence fails afterwards. The stored
/// blob likewise survives any downstream failure.
#[derive(Clone)]
pub struct IngestionPipeline {
    db: Arc<SurrealDbClient>,
    storage: StorageManager,
    embedder: Arc<EmbeddingProvider>,
    ocr: Option<OcrEngine>,
}

impl IngestionPipeline {
    pub fn new(
        db: Arc<SurrealDbClient>,
        storage: StorageManager,
        embedder: Arc<EmbeddingProvider>,
        ocr: Option<OcrEngine>,
    ) -> Self {
        Self {
            db,
            storage,
            embedder,
            ocr,
        }
    }

    /// Processes one upload. Every invocation yields a `start` event first
    /// and ends with exactly one terminal event, `done` or `error`; after an
    /// error no further stages run.
    pub fn stream(
        &self,
        upload: Option<UploadedFile>,
    ) -> impl Stream<Item = StageEvent> + Send + 'static {
        let pipeline = self.clone();

        stream! {
            yield StageEvent::Start {
                message: "Uploading file".to_string(),
            };

            let Some(upload) = upload else {
                yield StageEvent::error("No file provided");
                return;
            };

            let id = Uuid::new_v4().to_string();
            let path = format!("documents/{id}.{}", upload.extension());

            if let Err(e) = pipeline.storage.put(&path, upload.bytes.clone()).await {
                warn!(error = %e, path = %path, "Blob upload failed");
                yield StageEvent::error(format!("Upload failed: {e}"));
                return;
            }
            yield StageEvent::Uploaded { path: path.clone() };

            yield StageEvent::Extracting {
                message: "Detecting type and extracting text".to_string(),
            };
            let raw_text = match extraction::extract_text(&upload, pipeline.ocr.as_ref()).await {
                Ok(text) => text,
                Err(e) => {
                    yield StageEvent::error(e.to_string());
                    return;
                }
            };
            if raw_text.trim().is_empty() {
                yield StageEvent::error("No text extracted");
                return;
            }

            yield StageEvent::InsertDocument {
                message: "Inserting document".to_string(),
            };
            let document = Document::new(id.clone(), path, raw_text.clone());
            if let Err(e) = pipeline.db.store_item(document).await {
                yield StageEvent::error(format!("Document insert failed: {e}"));
                return;
            }

            yield StageEvent::Splitting {
                message: "Splitting text into chunks".to_string(),
            };
            let chunks = match crate::chunking::chunk_text(&raw_text) {
                Ok(chunks) => chunks,
                Err(e) => {
                    yield StageEvent::error(e.to_string());
                    return;
                }
            };

            yield StageEvent::Embedding {
                message: format!("Generating embeddings for {} chunks", chunks.len()),
            };
            let contents: Vec<String> = chunks.iter().map(|(_, text)| text.clone()).collect();
            let embeddings = match pipeline.embedder.embed_batch(&contents).await {
                Ok(embeddings) => embeddings,
                Err(e) => {
                    yield StageEvent::error(e.to_string());
                    return;
                }
            };

            yield StageEvent::InsertingChunks {
                message: "Inserting chunk embeddings".to_string(),
            };
            let rows: Vec<DocumentChunk> = chunks
                .into_iter()
                .zip(embeddings)
                .map(|((index, content), embedding)| {
                    DocumentChunk::new(id.clone(), index, content, embedding)
                })
                .collect();
            if let Err(e) = pipeline.db.store_items(rows).await {
                // The document row stays in place; re-ingestion can clean up.
                yield StageEvent::error(format!("Chunk insert failed: {e}"));
                return;
            }

            info!(document_id = %id, "Document ingested");
            yield StageEvent::Done { id };
        }
    }
}
