use crate::config::{EmbeddingProviderKind, Settings};
use crate::error::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 128;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Turns text into vectors. Ingestion and querying must use the same embedder,
/// otherwise stored and query vectors live in different spaces.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, SearchError>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// Hashed character-trigram vectors. Needs no model server; useful offline and
/// in tests.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Count lowercase character trigrams into hashed buckets, then scale the
    /// vector to unit length. Text shorter than three characters maps to zeros.
    pub fn vectorize(&self, text: &str) -> Vec<f32> {
        let width = self.dimensions.max(1);
        let mut vector = vec![0f32; width];

        let chars: Vec<char> = text.chars().flat_map(char::to_lowercase).collect();
        for trigram in chars.windows(3) {
            vector[bucket(trigram, width)] += 1.0;
        }

        let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|value| *value /= norm);
        }
        vector
    }
}

/// FNV-1a over the UTF-8 bytes of `trigram`, reduced to `0..width`.
fn bucket(trigram: &[char], width: usize) -> usize {
    let mut hash = FNV_OFFSET;
    let mut buf = [0u8; 4];
    for ch in trigram {
        for byte in ch.encode_utf8(&mut buf).bytes() {
            hash = (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME);
        }
    }
    (hash % width as u64) as usize
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    fn model_name(&self) -> &str {
        "ngram"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        Ok(self.vectorize(text))
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embeddings from an Ollama server's `/api/embed` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| SearchError::BackendResponse {
            backend: "ollama".to_string(),
            details: "embedding response was empty".to_string(),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/embed", self.base_url);
        debug!(%url, model = %self.model, count = texts.len(), "embedding batch");

        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::BackendResponse {
                backend: "ollama".to_string(),
                details: format!("{status}: {body}"),
            });
        }

        let parsed: EmbedResponse = response.json().await?;
        if parsed.embeddings.len() != texts.len() {
            return Err(SearchError::BackendResponse {
                backend: "ollama".to_string(),
                details: format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    parsed.embeddings.len()
                ),
            });
        }

        Ok(parsed.embeddings)
    }
}

/// The embedder selected by [`Settings::embedding_provider`].
#[derive(Debug, Clone)]
pub enum EmbeddingBackend {
    Ngram(CharacterNgramEmbedder),
    Ollama(OllamaEmbedder),
}

impl EmbeddingBackend {
    pub fn from_settings(settings: &Settings) -> Self {
        match settings.embedding_provider {
            EmbeddingProviderKind::Ngram => {
                Self::Ngram(CharacterNgramEmbedder::new(settings.embedding_dimensions))
            }
            EmbeddingProviderKind::Ollama => Self::Ollama(OllamaEmbedder::new(
                &settings.ollama_base_url,
                &settings.embedding_model,
            )),
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingBackend {
    fn model_name(&self) -> &str {
        match self {
            Self::Ngram(embedder) => embedder.model_name(),
            Self::Ollama(embedder) => embedder.model_name(),
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        match self {
            Self::Ngram(embedder) => embedder.embed(text).await,
            Self::Ollama(embedder) => embedder.embed(text).await,
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SearchError> {
        match self {
            Self::Ngram(embedder) => embedder.embed_batch(texts).await,
            Self::Ollama(embedder) => embedder.embed_batch(texts).await,
        }
    }
}
