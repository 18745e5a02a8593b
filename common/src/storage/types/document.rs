use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

stored_object!(Document, "document", {
    storage_path: String,
    raw_text: String
});

/// Listing row for the dashboard: everything but the raw text, which can be
/// arbitrarily large.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSummary {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub id: String,
    pub storage_path: String,
    #[serde(
        serialize_with = "serialize_datetime",
        deserialize_with = "deserialize_datetime",
        default
    )]
    pub created_at: DateTime<Utc>,
    pub text_length: usize,
}

impl Document {
    /// The id is assigned before insertion because the blob storage path is
    /// derived from it.
    pub fn new(id: String, storage_path: String, raw_text: String) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            storage_path,
            raw_text,
        }
    }

    pub async fn list_summaries(db: &SurrealDbClient) -> Result<Vec<DocumentSummary>, AppError> {
        let mut response = db
            .client
            .query(format!(
                "SELECT id, storage_path, created_at, string::len(raw_text) AS text_length \
                 FROM {} ORDER BY created_at DESC",
                Self::table_name()
            ))
            .await?;
        let summaries: Vec<DocumentSummary> = response.take(0)?;
        Ok(summaries)
    }
}
