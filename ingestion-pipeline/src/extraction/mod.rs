pub mod ocr;
pub mod pdf;

use common::error::AppError;

use crate::pipeline::UploadedFile;
use ocr::OcrEngine;

/// Extensions recognized as images when the declared content type is missing
/// or unhelpful.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp"];

/// Dispatches text extraction by declared MIME type / file extension.
///
/// PDFs go through the text-layer extractor, images through exactly one OCR
/// path, and anything else is decoded as text on a best-effort basis (which
/// may legitimately yield empty text). The caller is responsible for treating
/// whitespace-only output as a failure.
pub async fn extract_text(
    upload: &UploadedFile,
    ocr: Option<&OcrEngine>,
) -> Result<String, AppError> {
    let mime = upload.content_type_or_guess();
    let ext = upload.extension();

    if mime == "application/pdf" || ext == "pdf" {
        pdf::extract_pdf_text(upload.bytes.clone()).await
    } else if mime.starts_with("image/") || IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        match ocr {
            Some(engine) => engine.extract_text(upload).await,
            None => Err(AppError::Configuration(
                "No OCR engine configured. Set OCR_SPACE_API_KEY or GROQ_API_KEY.".into(),
            )),
        }
    } else {
        Ok(String::from_utf8_lossy(&upload.bytes).into_owned())
    }
}
