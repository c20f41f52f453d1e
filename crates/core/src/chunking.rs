use crate::error::IngestError;
use crate::preprocessing::clean_text;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Word-window sizes for the chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
        }
    }

    /// Rejects configs whose windows would not advance.
    ///
    /// [`chunk_words`] still terminates on such configs, this is for callers
    /// that would rather fail loudly on bad user input.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than chunk_size {}",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    fn step(&self) -> usize {
        self.chunk_size.saturating_sub(self.overlap).max(1)
    }
}

/// Splits `text` on whitespace and emits overlapping word windows.
///
/// Each window holds up to `chunk_size` words joined by single spaces and
/// starts `chunk_size - overlap` words after the previous one. The last window
/// is the first one that reaches the final word. A non-advancing config is
/// clamped to a one-word step.
pub fn chunk_words(text: &str, config: ChunkingConfig) -> Vec<String> {
    let words = text.split_whitespace().collect::<Vec<_>>();
    let size = config.chunk_size.max(1);
    let step = config.step();

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = start.saturating_add(size).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start = start.saturating_add(step);
    }

    chunks
}

pub fn chunk_label(document_name: &str, number: usize) -> String {
    format!("[Doc: {document_name} | Chunk {number}] ")
}

/// Prefixes every chunk with its `[Doc: <name> | Chunk <n>] ` label, 1-based.
pub fn label_chunks(document_name: &str, chunks: &[String]) -> Vec<String> {
    chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| format!("{}{chunk}", chunk_label(document_name, index + 1)))
        .collect()
}

/// A source document after cleaning, chunking and labeling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledDocument {
    pub name: String,
    pub chunks: Vec<String>,
}

pub fn prepare_document(name: &str, raw_text: &str, config: ChunkingConfig) -> LabeledDocument {
    let cleaned = clean_text(raw_text);
    let chunks = chunk_words(&cleaned, config);
    LabeledDocument {
        name: name.to_string(),
        chunks: label_chunks(name, &chunks),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn numbered_words(count: usize) -> String {
        (1..=count)
            .map(|index| format!("w{index}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn five_words_with_overlap_one_yield_two_windows() {
        let chunks = chunk_words("alpha beta gamma delta epsilon", ChunkingConfig::new(3, 1));
        assert_eq!(chunks, vec!["alpha beta gamma", "gamma delta epsilon"]);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_words("", ChunkingConfig::default()).is_empty());
        assert!(chunk_words(" \n\t ", ChunkingConfig::default()).is_empty());
    }

    #[test]
    fn short_input_yields_single_chunk() {
        let chunks = chunk_words("one  two\nthree", ChunkingConfig::default());
        assert_eq!(chunks, vec!["one two three"]);
    }

    #[test]
    fn chunk_count_matches_window_arithmetic() {
        let cases: [(usize, usize, usize); 5] = [
            (10, 3, 1),
            (11, 4, 2),
            (500, 500, 100),
            (1999, 500, 100),
            (7, 2, 0),
        ];

        for (words, size, overlap) in cases {
            let chunks = chunk_words(&numbered_words(words), ChunkingConfig::new(size, overlap));
            let expected = (words - overlap).div_ceil(size - overlap);
            assert_eq!(chunks.len(), expected, "words={words} size={size} overlap={overlap}");
        }
    }

    #[test]
    fn adjacent_chunks_share_exactly_overlap_words() {
        let chunks = chunk_words(&numbered_words(23), ChunkingConfig::new(6, 2));

        for pair in chunks.windows(2) {
            let left = pair[0].split(' ').collect::<Vec<_>>();
            let right = pair[1].split(' ').collect::<Vec<_>>();
            assert_eq!(left[left.len() - 2..], right[..2]);
        }

        let covered = chunks
            .iter()
            .flat_map(|chunk| chunk.split(' '))
            .collect::<std::collections::HashSet<_>>();
        assert_eq!(covered.len(), 23);
    }

    #[test]
    fn overlap_not_smaller_than_chunk_size_still_terminates() {
        let text = numbered_words(5);

        let equal = chunk_words(&text, ChunkingConfig::new(3, 3));
        assert_eq!(equal, vec!["w1 w2 w3", "w2 w3 w4", "w3 w4 w5"]);

        let larger = chunk_words(&text, ChunkingConfig::new(2, 10));
        assert_eq!(larger.len(), 4);
        assert_eq!(larger.last().map(String::as_str), Some("w4 w5"));

        let zero = chunk_words(&text, ChunkingConfig::new(0, 0));
        assert_eq!(zero.len(), 5);
    }

    #[test]
    fn validate_rejects_non_advancing_configs() {
        assert!(ChunkingConfig::default().validate().is_ok());
        assert!(ChunkingConfig::new(0, 0).validate().is_err());
        assert!(ChunkingConfig::new(3, 3).validate().is_err());
        assert!(ChunkingConfig::new(3, 2).validate().is_ok());
    }

    #[test]
    fn labels_are_one_based_per_document() {
        let labeled = label_chunks("doc.txt", &["first".to_string(), "second".to_string()]);
        assert_eq!(
            labeled,
            vec![
                "[Doc: doc.txt | Chunk 1] first",
                "[Doc: doc.txt | Chunk 2] second",
            ]
        );
    }

    #[test]
    fn prepare_document_cleans_before_chunking() {
        let document = prepare_document(
            "notes.txt",
            "Alpha, BETA! gamma https://x.io delta epsilon",
            ChunkingConfig::new(3, 1),
        );

        assert_eq!(document.name, "notes.txt");
        assert_eq!(
            document.chunks,
            vec![
                "[Doc: notes.txt | Chunk 1] alpha beta gamma",
                "[Doc: notes.txt | Chunk 2] gamma delta epsilon",
            ]
        );
    }

    fn advancing_config() -> impl Strategy<Value = ChunkingConfig> {
        (1usize..40).prop_flat_map(|size| {
            (0..size).prop_map(move |overlap| ChunkingConfig::new(size, overlap))
        })
    }

    proptest! {
        #[test]
        fn chunk_count_follows_window_arithmetic(
            words in 0usize..300,
            config in advancing_config(),
        ) {
            let chunks = chunk_words(&numbered_words(words), config);
            let step = config.chunk_size - config.overlap;
            let expected = match words {
                0 => 0,
                w if w <= config.chunk_size => 1,
                w => (w - config.overlap).div_ceil(step),
            };
            prop_assert_eq!(chunks.len(), expected);
        }

        #[test]
        fn chunks_cover_every_word_and_share_overlap(
            words in 1usize..300,
            config in advancing_config(),
        ) {
            let chunks = chunk_words(&numbered_words(words), config);

            let covered = chunks
                .iter()
                .flat_map(|chunk| chunk.split(' '))
                .collect::<std::collections::HashSet<_>>();
            prop_assert_eq!(covered.len(), words);

            for pair in chunks.windows(2) {
                let left = pair[0].split(' ').collect::<Vec<_>>();
                let right = pair[1].split(' ').collect::<Vec<_>>();
                prop_assert_eq!(left.len(), config.chunk_size);
                prop_assert_eq!(&left[left.len() - config.overlap..], &right[..config.overlap]);
            }
        }

        #[test]
        fn any_config_terminates_within_word_count(
            words in 0usize..100,
            size in 0usize..20,
            overlap in 0usize..40,
        ) {
            let chunks = chunk_words(&numbered_words(words), ChunkingConfig::new(size, overlap));
            prop_assert!(chunks.len() <= words);
            prop_assert!(chunks.iter().all(|chunk| !chunk.is_empty()));
        }
    }
}
