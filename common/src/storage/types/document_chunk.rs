use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};
use uuid::Uuid;

stored_object!(DocumentChunk, "document_chunk", {
    document_id: String,
    chunk_index: u32,
    content: String,
    embedding: Vec<f32>
});

impl DocumentChunk {
    pub fn new(document_id: String, chunk_index: u32, content: String, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            document_id,
            chunk_index,
            content,
            embedding,
        }
    }

    /// All chunks of one document, in ascending chunk order.
    pub async fn get_by_document(
        document_id: &str,
        db: &SurrealDbClient,
    ) -> Result<Vec<DocumentChunk>, AppError> {
        let mut response = db
            .client
            .query(format!(
                "SELECT * FROM {} WHERE document_id = $document_id ORDER BY chunk_index ASC",
                Self::table_name()
            ))
            .bind(("document_id", document_id.to_string()))
            .await?;
        let chunks: Vec<DocumentChunk> = response.take(0)?;
        Ok(chunks)
    }
}
