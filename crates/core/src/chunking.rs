use crate::config::Settings;
use crate::error::IngestError;

/// Window geometry in characters. Construct through [`ChunkingConfig::new`] so
/// the window always advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    max_chars: usize,
    overlap_chars: usize,
}

impl ChunkingConfig {
    pub fn new(max_chars: usize, overlap_chars: usize) -> Result<Self, IngestError> {
        if max_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if overlap_chars >= max_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {overlap_chars} must be smaller than chunk size {max_chars}"
            )));
        }
        Ok(Self {
            max_chars,
            overlap_chars,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, IngestError> {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }

    fn step(&self) -> usize {
        self.max_chars - self.overlap_chars
    }
}

/// Split `text` into windows of `max_chars` characters, each starting
/// `max_chars - overlap_chars` after the previous one. Blank windows are dropped.
pub fn chunk_text(text: &str, config: ChunkingConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();

    let mut start = 0;
    while start < chars.len() {
        let end = (start + config.max_chars).min(chars.len());
        let window = &chars[start..end];
        if window.iter().any(|c| !c.is_whitespace()) {
            chunks.push(window.iter().collect());
        }
        start += config.step();
    }

    chunks
}
