use serde::{Deserialize, Serialize};

/// Lifecycle state of one upload job as shown to the user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Uploading,
    Processing,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

/// One tracked upload, progress in percent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadJob {
    pub id: String,
    pub filename: String,
    pub progress: u8,
    pub status: JobStatus,
    pub error: Option<String>,
}

impl UploadJob {
    pub fn new(id: String, filename: String) -> Self {
        Self {
            id,
            filename,
            progress: 0,
            status: JobStatus::Uploading,
            error: None,
        }
    }
}
