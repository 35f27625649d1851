use crate::config::Settings;
use crate::embeddings::{EmbeddingBackend, Embedder};
use crate::error::{ConfigError, RagError};
use crate::llm::{ChatModel, LlmBackend, Message};
use crate::stores::QdrantStore;
use crate::traits::VectorIndex;
use crate::vector_store::VectorStoreAdapter;
use crate::{QueryFilters, SearchHit, SearchQuery};
use async_trait::async_trait;
use tracing::info;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant for questions about the documents \
in this collection. Answer exclusively on the basis of the given context. If you cannot find \
the answer in the context, say explicitly that you do not know.";

pub const DEFAULT_TOP_K: usize = 5;

/// Stateless question answering over the vector store. Conversation history is
/// supplied by the caller on every request.
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(
        &self,
        question: &str,
        history: &[Message],
        source: Option<&str>,
    ) -> Result<String, RagError>;
}

pub struct RagAssistant<V, E, M> {
    store: VectorStoreAdapter<V, E>,
    model: M,
    top_k: usize,
}

pub type DefaultAssistant = RagAssistant<QdrantStore, EmbeddingBackend, LlmBackend>;

impl DefaultAssistant {
    /// Wire Qdrant, the configured embedder and the configured chat backend.
    /// Fails before any network traffic when provider credentials are missing.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let model = LlmBackend::from_settings(settings)?;
        info!(provider = %model.kind(), model = settings.llm_model(), "chat backend resolved");
        let index = QdrantStore::new(&settings.qdrant_url, &settings.qdrant_collection_name)
            .with_api_key(settings.qdrant_api_key.clone());
        let store = VectorStoreAdapter::new(index, EmbeddingBackend::from_settings(settings))
            .with_batch_size(settings.embedding_batch_size);

        Ok(RagAssistant::new(store, model).with_top_k(settings.retrieval_k))
    }
}

impl<V, E, M> RagAssistant<V, E, M>
where
    V: VectorIndex,
    E: Embedder,
    M: ChatModel,
{
    pub fn new(store: VectorStoreAdapter<V, E>, model: M) -> Self {
        Self {
            store,
            model,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub async fn retrieve(
        &self,
        question: &str,
        source: Option<&str>,
    ) -> Result<Vec<SearchHit>, RagError> {
        let filters = QueryFilters {
            source: source.map(str::to_string),
        };
        let query = SearchQuery::new(question, self.top_k).with_filters(filters);
        Ok(self.store.search(&query).await?)
    }
}

#[async_trait]
impl<V, E, M> Answerer for RagAssistant<V, E, M>
where
    V: VectorIndex,
    E: Embedder,
    M: ChatModel,
{
    async fn answer(
        &self,
        question: &str,
        history: &[Message],
        source: Option<&str>,
    ) -> Result<String, RagError> {
        if question.trim().is_empty() {
            return Err(RagError::EmptyQuestion);
        }

        let hits = self.retrieve(question, source).await?;
        info!(retrieved = hits.len(), source = source.unwrap_or("*"), "answering question");

        let messages = build_messages(question, history, &hits);
        Ok(self.model.generate(&messages).await?)
    }
}

/// Retrieved texts in retrieval order, separated by blank lines.
pub fn build_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// System instruction, prior turns, the question, then the context block.
pub fn build_messages(question: &str, history: &[Message], hits: &[SearchHit]) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 3);
    messages.push(Message::system(SYSTEM_PROMPT));
    messages.extend_from_slice(history);
    messages.push(Message::user(question));
    messages.push(Message::user(format!("Context:\n{}", build_context(hits))));
    messages
}

/// Read a flat list of turns as alternating user/assistant messages, starting
/// with the user.
pub fn history_from_turns<S: AsRef<str>>(turns: &[S]) -> Vec<Message> {
    turns
        .iter()
        .enumerate()
        .map(|(index, turn)| {
            if index % 2 == 0 {
                Message::user(turn.as_ref())
            } else {
                Message::assistant(turn.as_ref())
            }
        })
        .collect()
}

pub fn append_to_history(history: &mut Vec<Message>, question: &str, answer: &str) {
    history.push(Message::user(question));
    history.push(Message::assistant(answer));
}
