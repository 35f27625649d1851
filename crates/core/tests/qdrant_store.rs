use localrag_core::{DocumentChunk, QdrantStore, QueryFilters, SearchError, VectorIndex};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chunk(text: &str, source: &str, page: u32) -> DocumentChunk {
    DocumentChunk {
        text: text.to_string(),
        source: source.to_string(),
        page,
    }
}

#[tokio::test]
async fn missing_collection_is_created_with_vector_size() -> Result<(), SearchError> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/collections/docs"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/collections/docs"))
        .and(body_partial_json(json!({ "vectors": { "size": 8, "distance": "Cosine" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/collections/docs/index"))
        .and(body_partial_json(json!({ "field_name": "source" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": {} })))
        .expect(1)
        .mount(&server)
        .await;

    QdrantStore::new(server.uri(), "docs").ensure_collection(8).await
}

#[tokio::test]
async fn existing_collection_is_left_alone() -> Result<(), SearchError> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/collections/docs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": {} })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    QdrantStore::new(server.uri(), "docs").ensure_collection(8).await
}

#[tokio::test]
async fn points_carry_source_page_and_text() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/collections/docs/points"))
        .and(header("api-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let store = QdrantStore::new(server.uri(), "docs").with_api_key(Some("secret".to_string()));
    store
        .index_vector_chunks(
            &[chunk("first", "x.pdf", 1), chunk("second", "x.pdf", 2)],
            &[vec![0.1, 0.2], vec![0.3, 0.4]],
        )
        .await?;

    let requests = server.received_requests().await.unwrap_or_default();
    let body: Value = requests[0].body_json()?;
    let points = body["points"].as_array().cloned().unwrap_or_default();

    assert_eq!(points.len(), 2);
    assert_eq!(points[1]["payload"], json!({ "source": "x.pdf", "page": 2, "text": "second" }));
    assert_ne!(points[0]["id"], points[1]["id"]);
    Ok(())
}

#[tokio::test]
async fn mismatched_embedding_count_is_rejected_locally() {
    let server = MockServer::start().await;
    let store = QdrantStore::new(server.uri(), "docs");

    let result = store
        .index_vector_chunks(&[chunk("only", "x.pdf", 1)], &[])
        .await;

    assert!(matches!(result, Err(SearchError::Request(_))));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn search_sends_source_filter_and_parses_hits() -> Result<(), SearchError> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/collections/docs/points/search"))
        .and(body_partial_json(json!({
            "limit": 3,
            "with_payload": true,
            "filter": { "must": [{ "key": "source", "match": { "value": "x.pdf" } }] }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [
                { "id": "a", "score": 0.91, "payload": { "source": "x.pdf", "page": 3, "text": "pump limits" } },
                { "id": "b", "score": 0.55, "payload": { "source": "x.pdf", "page": 1, "text": "intro" } }
            ],
            "status": "ok"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let hits = QdrantStore::new(server.uri(), "docs")
        .search_vector(&[0.5, 0.5], 3, &QueryFilters::source("x.pdf"))
        .await?;

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].chunk.text, "pump limits");
    assert_eq!(hits[0].chunk.page, 3);
    assert!(hits[0].score > hits[1].score);
    Ok(())
}

#[tokio::test]
async fn backend_errors_surface_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/collections/docs/points/search"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result = QdrantStore::new(server.uri(), "docs")
        .search_vector(&[0.5], 5, &QueryFilters::default())
        .await;

    match result {
        Err(SearchError::BackendResponse { backend, details }) => {
            assert_eq!(backend, "qdrant");
            assert!(details.contains("500"));
            assert!(details.contains("boom"));
        }
        other => panic!("expected backend error, got {other:?}"),
    }
}
