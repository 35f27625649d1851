use serde::{Deserialize, Serialize};

/// A window of page text tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    /// File name of the originating PDF, stable across ingestion runs.
    pub source: String,
    /// 1-based page number.
    pub page: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct QueryFilters {
    pub source: Option<String>,
}

impl QueryFilters {
    pub fn source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_none()
    }

    pub fn matches(&self, chunk: &DocumentChunk) -> bool {
        self.source
            .as_deref()
            .map_or(true, |source| chunk.source == source)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SearchQuery {
    pub text: String,
    pub top_k: usize,
    pub filters: QueryFilters,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, top_k: usize) -> Self {
        Self {
            text: text.into(),
            top_k,
            filters: QueryFilters::default(),
        }
    }

    pub fn with_filters(mut self, filters: QueryFilters) -> Self {
        self.filters = filters;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub chunk: DocumentChunk,
    pub score: f64,
}
