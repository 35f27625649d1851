//! Environment-driven settings.
//!
//! Every key is read as `LOCALRAG_{KEY}`. Values are validated once at load
//! time and the resulting [`Settings`] is never mutated afterwards; callers pass
//! it by reference to whatever they construct.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use url::Url;

use crate::embeddings::DEFAULT_EMBEDDING_DIMENSIONS;
use crate::error::ConfigError;

pub const ENV_PREFIX: &str = "LOCALRAG_";

/// Load `.env` from the working directory (silently ignored if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    Ollama,
    OpenAi,
}

impl LlmProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
        }
    }
}

impl fmt::Display for LlmProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    Ollama,
    Ngram,
}

impl EmbeddingProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::Ngram => "ngram",
        }
    }
}

#[derive(Clone)]
pub struct Settings {
    pub data_dir: PathBuf,

    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub qdrant_collection_name: String,

    pub embedding_provider: EmbeddingProviderKind,
    pub embedding_model: String,
    pub embedding_batch_size: usize,
    /// Vector width of the offline `ngram` embedder.
    pub embedding_dimensions: usize,

    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retrieval_k: usize,

    pub llm_provider: LlmProviderKind,
    pub ollama_model: String,
    pub ollama_base_url: String,
    pub openai_base_url: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
}

// API keys are redacted.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("data_dir", &self.data_dir)
            .field("qdrant_url", &self.qdrant_url)
            .field("qdrant_api_key", &self.qdrant_api_key.as_ref().map(|_| "***"))
            .field("qdrant_collection_name", &self.qdrant_collection_name)
            .field("embedding_provider", &self.embedding_provider)
            .field("embedding_model", &self.embedding_model)
            .field("embedding_batch_size", &self.embedding_batch_size)
            .field("embedding_dimensions", &self.embedding_dimensions)
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("retrieval_k", &self.retrieval_k)
            .field("llm_provider", &self.llm_provider)
            .field("ollama_model", &self.ollama_model)
            .field("ollama_base_url", &self.ollama_base_url)
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "***"))
            .field("openai_model", &self.openai_model)
            .finish()
    }
}

impl Settings {
    /// Build settings from the process environment (call [`load_dotenv`] first).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Keys are fully prefixed,
    /// e.g. `LOCALRAG_CHUNK_SIZE`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };

        let settings = Self {
            data_dir: PathBuf::from(env.string_or("DATA_DIR", "data")),
            qdrant_url: env.url_or("QDRANT_URL", "http://localhost:6333")?,
            qdrant_api_key: env.optional("QDRANT_API_KEY"),
            qdrant_collection_name: env.string_or("QDRANT_COLLECTION_NAME", "documents"),
            embedding_provider: parse_embedding_provider(&env)?,
            embedding_model: env.string_or("EMBEDDING_MODEL", "nomic-embed-text"),
            embedding_batch_size: env.usize_or("EMBEDDING_BATCH_SIZE", 32)?,
            embedding_dimensions: env.usize_or(
                "EMBEDDING_DIMENSIONS",
                DEFAULT_EMBEDDING_DIMENSIONS,
            )?,
            chunk_size: env.usize_or("CHUNK_SIZE", 900)?,
            chunk_overlap: env.usize_or("CHUNK_OVERLAP", 150)?,
            retrieval_k: env.usize_or("RETRIEVAL_K", 5)?,
            llm_provider: parse_llm_provider(&env)?,
            ollama_model: env.string_or("OLLAMA_MODEL", "mistral"),
            ollama_base_url: env.url_or("OLLAMA_BASE_URL", "http://localhost:11434")?,
            openai_base_url: env.url_or("OPENAI_BASE_URL", "https://api.openai.com/v1")?,
            openai_api_key: env.optional("OPENAI_API_KEY"),
            openai_model: env.string_or("OPENAI_MODEL", "gpt-4o-mini"),
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(invalid("CHUNK_SIZE", "0", "must be greater than zero"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(invalid(
                "CHUNK_OVERLAP",
                &self.chunk_overlap.to_string(),
                &format!("must be smaller than chunk size {}", self.chunk_size),
            ));
        }
        if self.embedding_batch_size == 0 {
            return Err(invalid("EMBEDDING_BATCH_SIZE", "0", "must be greater than zero"));
        }
        if self.embedding_dimensions == 0 {
            return Err(invalid("EMBEDDING_DIMENSIONS", "0", "must be greater than zero"));
        }
        if self.retrieval_k == 0 {
            return Err(invalid("RETRIEVAL_K", "0", "must be greater than zero"));
        }
        Ok(())
    }

    /// Same settings with a different data directory, for one-off CLI runs.
    pub fn with_data_dir(&self, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..self.clone()
        }
    }

    /// Model name of the active language-model provider.
    pub fn llm_model(&self) -> &str {
        match self.llm_provider {
            LlmProviderKind::Ollama => &self.ollama_model,
            LlmProviderKind::OpenAi => &self.openai_model,
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("settings loaded:");
        tracing::info!("  data:       dir={}", self.data_dir.display());
        tracing::info!(
            "  qdrant:     url={}, collection={}, api_key={}",
            self.qdrant_url,
            self.qdrant_collection_name,
            if self.qdrant_api_key.is_some() { "set" } else { "unset" }
        );
        tracing::info!(
            "  embedding:  provider={}, model={}, batch={}, ngram_dims={}",
            self.embedding_provider.as_str(),
            self.embedding_model,
            self.embedding_batch_size,
            self.embedding_dimensions
        );
        tracing::info!(
            "  chunking:   size={}, overlap={}, k={}",
            self.chunk_size,
            self.chunk_overlap,
            self.retrieval_k
        );
        tracing::info!("  llm:        provider={}, model={}", self.llm_provider, self.llm_model());
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(&format!("{ENV_PREFIX}{key}"))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn usize_or(&self, key: &str, default: usize) -> Result<usize, ConfigError> {
        match self.optional(key) {
            Some(value) => value
                .parse()
                .map_err(|_| invalid(key, &value, "expected a non-negative integer")),
            None => Ok(default),
        }
    }

    fn url_or(&self, key: &str, default: &str) -> Result<String, ConfigError> {
        let value = self.string_or(key, default);
        Url::parse(&value).map_err(|error| invalid(key, &value, &error.to_string()))?;
        Ok(value.trim_end_matches('/').to_string())
    }
}

fn parse_llm_provider<F>(env: &EnvReader<F>) -> Result<LlmProviderKind, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = env.string_or("LLM_PROVIDER", "ollama");
    match value.to_ascii_lowercase().as_str() {
        "ollama" => Ok(LlmProviderKind::Ollama),
        "openai" => Ok(LlmProviderKind::OpenAi),
        _ => Err(ConfigError::UnsupportedProvider {
            key: format!("{ENV_PREFIX}LLM_PROVIDER"),
            value,
        }),
    }
}

fn parse_embedding_provider<F>(env: &EnvReader<F>) -> Result<EmbeddingProviderKind, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = env.string_or("EMBEDDING_PROVIDER", "ollama");
    match value.to_ascii_lowercase().as_str() {
        "ollama" => Ok(EmbeddingProviderKind::Ollama),
        "ngram" => Ok(EmbeddingProviderKind::Ngram),
        _ => Err(ConfigError::UnsupportedProvider {
            key: format!("{ENV_PREFIX}EMBEDDING_PROVIDER"),
            value,
        }),
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key: format!("{ENV_PREFIX}{key}"),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
