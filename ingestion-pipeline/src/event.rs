use serde::{Deserialize, Serialize};

/// One progress record on the upload response stream.
///
/// Records are serialized as single JSON lines with a `stage` discriminator,
/// e.g. `{"stage":"uploaded","path":"documents/<id>.pdf"}`. A stream always
/// ends with either `done` or `error`; no success stage repeats within one
/// invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageEvent {
    Start { message: String },
    Uploaded { path: String },
    Extracting { message: String },
    InsertDocument { message: String },
    Splitting { message: String },
    Embedding { message: String },
    InsertingChunks { message: String },
    Done { id: String },
    Error { message: String },
    /// A stage emitted by a newer server that this decoder does not know
    /// about. Treated as a no-op by clients.
    #[serde(other)]
    Unknown,
}

impl StageEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// Wire encoding: one JSON object terminated by a newline. Falls back to
    /// a literal error line so a serialization fault can never break the
    /// stream framing.
    pub fn to_line(&self) -> String {
        match serde_json::to_string(self) {
            Ok(mut line) => {
                line.push('\n');
                line
            }
            Err(_) => "{\"stage\":\"error\",\"message\":\"event serialization failed\"}\n"
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_stage_discriminator() {
        let line = StageEvent::Start {
            message: "Uploading file".into(),
        }
        .to_line();
        assert_eq!(line, "{\"stage\":\"start\",\"message\":\"Uploading file\"}\n");

        let line = StageEvent::Done { id: "abc".into() }.to_line();
        assert_eq!(line, "{\"stage\":\"done\",\"id\":\"abc\"}\n");

        let line = StageEvent::InsertingChunks {
            message: "Inserting chunk embeddings".into(),
        }
        .to_line();
        assert!(line.starts_with("{\"stage\":\"inserting_chunks\""));
    }

    #[test]
    fn deserializes_known_stages() {
        let event: StageEvent =
            serde_json::from_str("{\"stage\":\"uploaded\",\"path\":\"documents/x.pdf\"}").unwrap();
        assert_eq!(
            event,
            StageEvent::Uploaded {
                path: "documents/x.pdf".into()
            }
        );
    }

    #[test]
    fn unknown_stage_decodes_to_unknown() {
        let event: StageEvent =
            serde_json::from_str("{\"stage\":\"reticulating\",\"message\":\"hi\"}").unwrap();
        assert_eq!(event, StageEvent::Unknown);
    }

    #[test]
    fn terminal_detection() {
        assert!(StageEvent::error("boom").is_terminal());
        assert!(StageEvent::Done { id: "1".into() }.is_terminal());
        assert!(!StageEvent::Unknown.is_terminal());
    }
}
