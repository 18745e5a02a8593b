use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ImageDetail, ImageUrlArgs,
    },
    Client,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{error::AppError, utils::config::AppConfig};
use serde::Deserialize;
use tracing::debug;

use crate::pipeline::UploadedFile;

const OCR_SPACE_ENDPOINT: &str = "https://api.ocr.space/parse/image";
const OCR_VISION_PROMPT: &str =
    "Transcribe all text visible in this image verbatim. Preserve the reading order and line \
     breaks. Respond with the transcribed text only, without commentary.";
const OCR_VISION_MAX_TOKENS: u32 = 6400;

/// OCR strategy resolved once at startup.
///
/// The hosted OCR.Space engine is preferred when its API key is configured;
/// otherwise image transcription runs through a vision-capable chat model on
/// the OpenAI-compatible endpoint. Exactly one path is taken per request,
/// with no cross-engine fallback on failure.
#[derive(Clone)]
pub struct OcrEngine {
    inner: OcrInner,
}

#[derive(Clone)]
enum OcrInner {
    OcrSpace {
        http: reqwest::Client,
        api_key: String,
        endpoint: String,
    },
    Vision {
        client: Arc<Client<OpenAIConfig>>,
        model: String,
    },
}

impl OcrEngine {
    /// Returns `None` when neither engine can be configured; image uploads
    /// then fail at extraction time with a configuration error.
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        if let Some(key) = &config.ocr_space_api_key {
            Some(Self::new_ocr_space(key))
        } else {
            config
                .groq_api_key
                .as_deref()
                .map(|key| Self::new_vision(key, &config.groq_base_url, &config.ocr_vision_model))
        }
    }

    pub fn new_ocr_space(api_key: &str) -> Self {
        Self {
            inner: OcrInner::OcrSpace {
                http: reqwest::Client::new(),
                api_key: api_key.to_string(),
                endpoint: OCR_SPACE_ENDPOINT.to_string(),
            },
        }
    }

    pub fn new_vision(api_key: &str, api_base: &str, model: &str) -> Self {
        let client = Client::with_config(
            OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(api_base),
        );
        Self {
            inner: OcrInner::Vision {
                client: Arc::new(client),
                model: model.to_string(),
            },
        }
    }

    pub fn label(&self) -> &'static str {
        match self.inner {
            OcrInner::OcrSpace { .. } => "ocr.space",
            OcrInner::Vision { .. } => "vision",
        }
    }

    pub async fn extract_text(&self, upload: &UploadedFile) -> Result<String, AppError> {
        match &self.inner {
            OcrInner::OcrSpace {
                http,
                api_key,
                endpoint,
            } => ocr_space_extract(http, api_key, endpoint, upload).await,
            OcrInner::Vision { client, model } => vision_extract(client, model, upload).await,
        }
    }
}

async fn ocr_space_extract(
    http: &reqwest::Client,
    api_key: &str,
    endpoint: &str,
    upload: &UploadedFile,
) -> Result<String, AppError> {
    let mime = upload.content_type_or_guess();
    let part = reqwest::multipart::Part::bytes(upload.bytes.to_vec())
        .file_name(upload.filename.clone())
        .mime_str(&mime)?;
    let form = reqwest::multipart::Form::new()
        .text("language", "eng")
        .text("isOverlayRequired", "false")
        .text("OCREngine", "2")
        .part("file", part);

    let response = http
        .post(endpoint)
        .header("apikey", api_key)
        .multipart(form)
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(AppError::Processing(format!(
            "OCR request failed: {}",
            response.status()
        )));
    }

    let parsed: OcrSpaceResponse = response.json().await?;
    if parsed.is_errored_on_processing {
        return Err(AppError::Processing(format!(
            "OCR processing failed: {}",
            parsed.error_message.join("; ")
        )));
    }

    let text = parsed
        .parsed_results
        .iter()
        .map(|result| result.parsed_text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    debug!(chars = text.len(), "OCR.Space returned text");
    Ok(text)
}

async fn vision_extract(
    client: &Client<OpenAIConfig>,
    model: &str,
    upload: &UploadedFile,
) -> Result<String, AppError> {
    let mime = upload.content_type_or_guess();
    let base64_image = STANDARD.encode(&upload.bytes);
    let image_url = format!("data:{mime};base64,{base64_image}");

    let request = CreateChatCompletionRequestArgs::default()
        .model(model)
        .max_tokens(OCR_VISION_MAX_TOKENS)
        .messages([ChatCompletionRequestUserMessageArgs::default()
            .content(vec![
                ChatCompletionRequestMessageContentPartTextArgs::default()
                    .text(OCR_VISION_PROMPT)
                    .build()?
                    .into(),
                ChatCompletionRequestMessageContentPartImageArgs::default()
                    .image_url(
                        ImageUrlArgs::default()
                            .url(image_url)
                            .detail(ImageDetail::High)
                            .build()?,
                    )
                    .build()?
                    .into(),
            ])
            .build()?
            .into()])
        .build()?;

    let response = client.chat().create(request).await?;

    let text = response
        .choices
        .first()
        .and_then(|choice| choice.message.content.as_ref())
        .cloned()
        .unwrap_or_default();

    Ok(text)
}

/// Loosely shaped OCR.Space response; fields the engine may omit default to
/// empty.
#[derive(Deserialize)]
struct OcrSpaceResponse {
    #[serde(rename = "ParsedResults", default)]
    parsed_results: Vec<OcrSpaceResult>,
    #[serde(rename = "IsErroredOnProcessing", default)]
    is_errored_on_processing: bool,
    #[serde(rename = "ErrorMessage", default)]
    error_message: Vec<String>,
}

#[derive(Deserialize)]
struct OcrSpaceResult {
    #[serde(rename = "ParsedText", default)]
    parsed_text: String,
}
