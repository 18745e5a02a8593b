use common::error::AppError;
use text_splitter::{ChunkConfig, TextSplitter};

/// Target chunk size in characters.
pub const CHUNK_SIZE: usize = 1000;
/// Characters of the previous chunk carried into the next one.
pub const CHUNK_OVERLAP: usize = 200;

/// Splits raw text into overlapping chunks, preferring larger structural
/// boundaries (paragraph, line, sentence, word) before falling back to a hard
/// character cut. Indices are assigned in document order starting at 0.
///
/// Splitting is deterministic: the same input always yields the same chunk
/// sequence.
pub fn chunk_text(raw_text: &str) -> Result<Vec<(u32, String)>, AppError> {
    let config = ChunkConfig::new(CHUNK_SIZE)
        .with_overlap(CHUNK_OVERLAP)
        .map_err(|err| AppError::Processing(format!("Invalid chunking configuration: {err}")))?;
    let splitter = TextSplitter::new(config);

    Ok(splitter
        .chunks(raw_text)
        .enumerate()
        .map(|(index, chunk)| (index as u32, chunk.to_owned()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splitting_is_deterministic() {
        let text = "One sentence here. Another sentence follows.\n\n".repeat(60);

        let first = chunk_text(&text).unwrap();
        let second = chunk_text(&text).unwrap();

        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn indices_are_contiguous_and_chunks_bounded() {
        let text = "word ".repeat(2000);
        let chunks = chunk_text(&text).unwrap();

        for (expected, (index, content)) in chunks.iter().enumerate() {
            assert_eq!(*index, expected as u32);
            assert!(content.chars().count() <= CHUNK_SIZE);
        }
        assert!(chunks.len() > 1);
    }

    #[test]
    fn unbroken_text_falls_back_to_character_cuts() {
        // No structural boundaries at all: 2500 chars cut at 1000 with a 200
        // character overlap gives exactly three chunks.
        let text = "x".repeat(2500);
        let chunks = chunk_text(&text).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].1.len(), 1000);
        assert_eq!(chunks[1].1.len(), 1000);
        assert_eq!(chunks[2].1.len(), 900);
    }

    #[test]
    fn consecutive_chunks_overlap() {
        let text = "y".repeat(2500);
        let chunks = chunk_text(&text).unwrap();

        for pair in chunks.windows(2) {
            let previous = &pair[0].1;
            let next = &pair[1].1;
            let tail: String = previous
                .chars()
                .skip(previous.chars().count().saturating_sub(CHUNK_OVERLAP))
                .collect();
            assert!(next.starts_with(&tail));
        }
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk_text("just a little text").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], (0, "just a little text".to_string()));
    }
}
