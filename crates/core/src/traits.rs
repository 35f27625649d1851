use crate::{DocumentChunk, QueryFilters, SearchError, SearchHit};
use async_trait::async_trait;

/// The external vector database as seen by the rest of the crate.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Make sure the collection exists and accepts vectors of `vector_size`.
    async fn ensure_collection(&self, vector_size: usize) -> Result<(), SearchError>;

    async fn index_vector_chunks(
        &self,
        chunks: &[DocumentChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), SearchError>;

    /// Nearest neighbours of `query_vector`, best match first.
    async fn search_vector(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filters: &QueryFilters,
    ) -> Result<Vec<SearchHit>, SearchError>;
}
