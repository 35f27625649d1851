use crate::embeddings::Embedder;
use crate::ingest::{IngestionReport, SkippedPdf};
use crate::traits::VectorIndex;
use crate::{DocumentChunk, SearchError, SearchHit, SearchQuery};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Maps chunks to embeddings plus metadata records and back. Owns no indexing
/// logic; nearest-neighbour ranking is left to the [`VectorIndex`].
pub struct VectorStoreAdapter<V, E> {
    index: V,
    embedder: E,
    batch_size: usize,
    collection_ready: AtomicBool,
}

impl<V, E> VectorStoreAdapter<V, E>
where
    V: VectorIndex,
    E: Embedder,
{
    pub fn new(index: V, embedder: E) -> Self {
        Self {
            index,
            embedder,
            batch_size: DEFAULT_BATCH_SIZE,
            collection_ready: AtomicBool::new(false),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Embed and upsert every chunk, returning how many were stored. An empty
    /// input never touches the database.
    pub async fn store<I>(&self, chunks: I) -> Result<usize, SearchError>
    where
        I: IntoIterator<Item = DocumentChunk>,
        I::IntoIter: Send,
    {
        let report = self.ingest(chunks.into_iter().map(Ok)).await?;
        Ok(report.stored)
    }

    /// Pull chunks one batch at a time and store them. Skipped documents are
    /// collected into the report; a backend failure aborts the run.
    pub async fn ingest<I>(&self, items: I) -> Result<IngestionReport, SearchError>
    where
        I: IntoIterator<Item = Result<DocumentChunk, SkippedPdf>>,
        I::IntoIter: Send,
    {
        let mut report = IngestionReport::default();
        let mut batch = Vec::with_capacity(self.batch_size);

        for item in items {
            match item {
                Ok(chunk) => batch.push(chunk),
                Err(skipped) => {
                    warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped pdf");
                    report.skipped_files.push(skipped);
                }
            }

            if batch.len() >= self.batch_size {
                report.stored += self.flush(&mut batch).await?;
            }
        }
        report.stored += self.flush(&mut batch).await?;

        Ok(report)
    }

    async fn flush(&self, batch: &mut Vec<DocumentChunk>) -> Result<usize, SearchError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if !self.collection_ready.load(Ordering::Acquire) {
            let vector_size = embeddings.first().map(Vec::len).unwrap_or_default();
            self.index.ensure_collection(vector_size).await?;
            self.collection_ready.store(true, Ordering::Release);
        }

        self.index.index_vector_chunks(batch, &embeddings).await?;

        let stored = batch.len();
        info!(stored, "stored chunk batch");
        batch.clear();
        Ok(stored)
    }

    /// Top `query.top_k` chunks for `query.text`, best first, restricted to
    /// `query.filters`.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, SearchError> {
        if query.text.trim().is_empty() {
            return Err(SearchError::Request("query is empty".to_string()));
        }

        let query_vector = self.embedder.embed(&query.text).await?;
        let hits = self
            .index
            .search_vector(&query_vector, query.top_k, &query.filters)
            .await?;

        let hits: Vec<SearchHit> = hits
            .into_iter()
            .filter(|hit| query.filters.matches(&hit.chunk))
            .take(query.top_k)
            .collect();
        debug!(count = hits.len(), "retrieved chunks");
        Ok(hits)
    }
}
