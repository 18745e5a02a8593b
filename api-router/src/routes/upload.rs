use std::convert::Infallible;

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE},
        StatusCode,
    },
    response::IntoResponse,
};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use bytes::Bytes;
use futures::StreamExt;
use ingestion_pipeline::UploadedFile;
use tracing::info;

use crate::api_state::ApiState;

#[derive(Debug, TryFromMultipart)]
pub struct UploadParams {
    // The route-level body limit is the real cap.
    #[form_data(limit = "unlimited")]
    pub file: Option<FieldData<Bytes>>,
}

/// Accepts one multipart file upload and streams ingestion progress back as
/// newline-delimited JSON. A missing file part still answers 200; the error
/// is reported in-stream so every client goes through one decode path.
pub async fn upload_document(
    State(state): State<ApiState>,
    TypedMultipart(input): TypedMultipart<UploadParams>,
) -> impl IntoResponse {
    let upload = input.file.map(|field| {
        let filename = field
            .metadata
            .file_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "upload.bin".to_string());
        info!(
            filename = %filename,
            bytes = field.contents.len(),
            "Received upload request"
        );
        UploadedFile::new(filename, field.metadata.content_type, field.contents)
    });

    let stream = state.pipeline.stream(upload);
    let body = Body::from_stream(
        stream.map(|event| Ok::<_, Infallible>(Bytes::from(event.to_line()))),
    );

    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "application/x-ndjson"),
            (CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{http::Request, Router};
    use common::{
        storage::{db::SurrealDbClient, store::StorageManager},
        utils::{
            config::{AppConfig, StorageKind},
            embedding::EmbeddingProvider,
        },
    };
    use http_body_util::BodyExt;
    use ingestion_pipeline::{IngestionPipeline, StageEvent};
    use object_store::memory::InMemory;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{api_routes_v1, api_state::ApiState};

    async fn test_router() -> Router {
        let config = AppConfig::for_tests();
        let db = Arc::new(
            SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
                .await
                .expect("Failed to start in-memory surrealdb"),
        );
        let storage =
            StorageManager::with_backend(Arc::new(InMemory::new()), StorageKind::Memory);
        let embedder = Arc::new(EmbeddingProvider::new_hashed(16));
        let pipeline = IngestionPipeline::new(db.clone(), storage, embedder, None);
        let state = ApiState::new(db, config, pipeline);
        Router::new()
            .merge(api_routes_v1(&state))
            .with_state(state)
    }

    fn multipart_body(boundary: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        body
    }

    fn decode_lines(raw: &[u8]) -> Vec<StageEvent> {
        raw.split(|b| *b == b'\n')
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_slice(line).expect("Each line should be a valid event"))
            .collect()
    }

    #[tokio::test]
    async fn upload_streams_ndjson_until_done() {
        let router = test_router().await;
        let boundary = "test-boundary";
        let body = multipart_body(boundary, "notes.txt", "text/plain", b"hello from the test");

        let response = router
            .oneshot(
                Request::post("/upload")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(axum::body::Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/x-ndjson"
        );
        assert_eq!(response.headers().get("cache-control").unwrap(), "no-cache");

        let raw = response.into_body().collect().await.unwrap().to_bytes();
        let events = decode_lines(&raw);

        assert_eq!(
            events.first(),
            Some(&StageEvent::Start {
                message: "Uploading file".to_string()
            })
        );
        assert!(matches!(events.last(), Some(StageEvent::Done { .. })));
    }

    #[tokio::test]
    async fn missing_file_reports_error_in_stream() {
        let router = test_router().await;
        let boundary = "test-boundary";
        // A form with no parts at all.
        let body = format!("--{boundary}--\r\n").into_bytes();

        let response = router
            .oneshot(
                Request::post("/upload")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(axum::body::Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let raw = response.into_body().collect().await.unwrap().to_bytes();
        let events = decode_lines(&raw);

        assert_eq!(
            events.last(),
            Some(&StageEvent::Error {
                message: "No file provided".to_string()
            })
        );
    }

    #[tokio::test]
    async fn documents_listing_reflects_uploads() {
        let router = test_router().await;
        let boundary = "test-boundary";
        let body = multipart_body(boundary, "listed.txt", "text/plain", b"some listed text");

        let response = router
            .clone()
            .oneshot(
                Request::post("/upload")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(axum::body::Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        // Drain the stream so ingestion runs to completion.
        let raw = response.into_body().collect().await.unwrap().to_bytes();
        assert!(matches!(
            decode_lines(&raw).last(),
            Some(StageEvent::Done { .. })
        ));

        let response = router
            .oneshot(
                Request::get("/documents")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);

        let raw = response.into_body().collect().await.unwrap().to_bytes();
        let listed: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        let rows = listed.as_array().expect("Listing should be a JSON array");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["text_length"], 16);
        assert!(rows[0]["storage_path"]
            .as_str()
            .unwrap()
            .starts_with("documents/"));
    }

    #[tokio::test]
    async fn probes_respond() {
        let router = test_router().await;

        let response = router
            .clone()
            .oneshot(
                Request::get("/live")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);

        let response = router
            .oneshot(
                Request::get("/ready")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
