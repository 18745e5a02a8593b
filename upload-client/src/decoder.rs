use ingestion_pipeline::StageEvent;
use tracing::warn;

/// Incremental decoder for newline-delimited JSON progress streams.
///
/// Network reads arrive in arbitrary chunks, so bytes are buffered until a
/// full line is available; a partial trailing line stays in the buffer for
/// the next push. Malformed lines are skipped rather than aborting the
/// stream.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk of bytes and returns every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StageEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice(&line) {
                Ok(event) => events.push(event),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed progress line");
                }
            }
        }
        events
    }
}
