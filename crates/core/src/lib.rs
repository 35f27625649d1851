pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod rag;
pub mod stores;
pub mod traits;
pub mod vector_store;

pub use chunking::{chunk_text, ChunkingConfig};
pub use config::{load_dotenv, EmbeddingProviderKind, LlmProviderKind, Settings};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, EmbeddingBackend, OllamaEmbedder,
    DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{ConfigError, IngestError, LlmError, RagError, SearchError};
pub use extractor::{extract_page_texts, LopdfExtractor, PdfExtractor};
pub use ingest::{list_documents, produce_chunks, ChunkStream, IngestionReport, SkippedPdf};
pub use llm::{ChatModel, LlmBackend, Message, OllamaChat, OpenAiChat, Role};
pub use models::{DocumentChunk, QueryFilters, SearchHit, SearchQuery};
pub use rag::{
    append_to_history, build_messages, history_from_turns, Answerer, DefaultAssistant,
    RagAssistant,
};
pub use stores::QdrantStore;
pub use traits::VectorIndex;
pub use vector_store::VectorStoreAdapter;
