use bytes::Bytes;
use common::error::AppError;

/// Extracts the text layer of a PDF with `pdf-extract`, on a blocking thread
/// since parsing is CPU-bound.
///
/// Scanned PDFs without a text layer come back (near) empty; the pipeline
/// treats that as "No text extracted" rather than an extraction fault.
pub async fn extract_pdf_text(bytes: Bytes) -> Result<String, AppError> {
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await?
        .map_err(|err| AppError::Processing(format!("Failed to extract text from PDF: {err}")))?;

    Ok(text)
}
