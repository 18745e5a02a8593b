use bytes::Bytes;
use futures::StreamExt;
use tracing::{debug, warn};

use crate::{decoder::NdjsonDecoder, registry::JobRegistry};

/// HTTP client for the upload endpoint.
///
/// Each upload registers a job, posts the file as multipart form data and
/// consumes the NDJSON progress stream, forwarding every decoded event to
/// the registry. Transport failures surface as a failed job, never as a
/// panic or a lost job.
#[derive(Clone)]
pub struct UploadClient {
    http: reqwest::Client,
    endpoint: String,
    registry: JobRegistry,
}

impl UploadClient {
    /// `endpoint` is the full upload URL, e.g.
    /// `http://localhost:3000/api/v1/upload`.
    pub fn new(endpoint: impl Into<String>, registry: JobRegistry) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            registry,
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Uploads one file and follows its progress stream to the end. Returns
    /// the job id; the job's final state lives in the registry.
    pub async fn upload(&self, filename: &str, bytes: Bytes) -> String {
        let job_id = self.registry.register(filename);

        if let Err(e) = self.stream_upload(&job_id, filename, bytes).await {
            warn!(job_id, error = %e, "Upload stream failed");
            self.registry.fail(&job_id, format!("Upload failed: {e}"));
        }

        job_id
    }

    async fn stream_upload(
        &self,
        job_id: &str,
        filename: &str,
        bytes: Bytes,
    ) -> Result<(), reqwest::Error> {
        let mime = mime_guess::from_path(filename)
            .first_raw()
            .unwrap_or("application/octet-stream");
        let part = reqwest::multipart::Part::bytes(bytes.to_vec())
            .file_name(filename.to_string())
            .mime_str(mime)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            self.registry
                .fail(job_id, format!("Upload failed: {status}"));
            return Ok(());
        }

        let mut decoder = NdjsonDecoder::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for event in decoder.push(&chunk) {
                debug!(job_id, ?event, "Progress event");
                self.registry.apply(job_id, &event);
            }
        }

        Ok(())
    }
}
