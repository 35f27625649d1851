use crate::traits::VectorIndex;
use crate::{DocumentChunk, QueryFilters, SearchError, SearchHit};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

/// Qdrant over its REST API. Points carry `{source, page, text}` payloads.
pub struct QdrantStore {
    endpoint: String,
    collection: String,
    api_key: Option<String>,
    client: Client,
}

impl QdrantStore {
    pub fn new(endpoint: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            api_key: None,
            client: Client::new(),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{}", self.endpoint, self.collection, suffix)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        }
    }

    async fn check(response: Response) -> Result<Response, SearchError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(SearchError::BackendResponse {
            backend: "qdrant".to_string(),
            details: format!("{status}: {body}"),
        })
    }
}

fn source_filter(filters: &QueryFilters) -> Option<Value> {
    filters.source.as_ref().map(|source| {
        json!({
            "must": [
                { "key": "source", "match": { "value": source } }
            ]
        })
    })
}

fn hit_from_point(point: &Value) -> Option<SearchHit> {
    let text = point.pointer("/payload/text").and_then(Value::as_str)?;
    let source = point
        .pointer("/payload/source")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let page = point
        .pointer("/payload/page")
        .and_then(Value::as_u64)
        .and_then(|page| u32::try_from(page).ok())
        .unwrap_or(1);
    let score = point.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);

    Some(SearchHit {
        chunk: DocumentChunk {
            text: text.to_string(),
            source: source.to_string(),
            page,
        },
        score,
    })
}

#[async_trait]
impl VectorIndex for QdrantStore {
    async fn ensure_collection(&self, vector_size: usize) -> Result<(), SearchError> {
        let response = self
            .authorized(self.client.get(self.collection_url("")))
            .send()
            .await?;

        if response.status() != StatusCode::NOT_FOUND {
            Self::check(response).await?;
            debug!(collection = %self.collection, "collection exists");
            return Ok(());
        }

        info!(collection = %self.collection, vector_size, "creating collection");
        let response = self
            .authorized(self.client.put(self.collection_url("")))
            .json(&json!({
                "vectors": { "size": vector_size, "distance": "Cosine" }
            }))
            .send()
            .await?;
        Self::check(response).await?;

        let response = self
            .authorized(self.client.put(self.collection_url("/index?wait=true")))
            .json(&json!({ "field_name": "source", "field_schema": "keyword" }))
            .send()
            .await?;
        Self::check(response).await?;

        Ok(())
    }

    async fn index_vector_chunks(
        &self,
        chunks: &[DocumentChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), SearchError> {
        if chunks.len() != embeddings.len() {
            return Err(SearchError::Request(format!(
                "embedding count {} doesn't match chunk count {}",
                embeddings.len(),
                chunks.len()
            )));
        }

        if chunks.is_empty() {
            return Ok(());
        }

        let points = chunks
            .iter()
            .zip(embeddings.iter())
            .map(|(chunk, embedding)| {
                json!({
                    "id": Uuid::new_v4().to_string(),
                    "vector": embedding,
                    "payload": {
                        "source": chunk.source,
                        "page": chunk.page,
                        "text": chunk.text,
                    },
                })
            })
            .collect::<Vec<_>>();

        let response = self
            .authorized(self.client.put(self.collection_url("/points?wait=true")))
            .json(&json!({ "points": points }))
            .send()
            .await?;
        Self::check(response).await?;

        Ok(())
    }

    async fn search_vector(
        &self,
        query_vector: &[f32],
        top_k: usize,
        filters: &QueryFilters,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let mut body = json!({
            "vector": query_vector,
            "limit": top_k,
            "with_payload": true,
        });
        if let Some(filter) = source_filter(filters) {
            body["filter"] = filter;
        }

        let response = self
            .authorized(self.client.post(self.collection_url("/points/search")))
            .json(&body)
            .send()
            .await?;
        let parsed: Value = Self::check(response).await?.json().await?;

        let points = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .ok_or_else(|| SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: "search response has no result array".to_string(),
            })?;

        Ok(points.iter().filter_map(hit_from_point).collect())
    }
}
