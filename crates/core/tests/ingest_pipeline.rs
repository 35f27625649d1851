use localrag_core::{
    list_documents, produce_chunks, CharacterNgramEmbedder, ChunkingConfig, DocumentChunk,
    QdrantStore, VectorStoreAdapter,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde_json::{json, Value};
use std::path::Path;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Write a PDF with one line of Courier text per page.
fn write_pdf(target: &Path, pages: &[&str]) -> TestResult {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let page_count = i64::try_from(kids.len())?;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(target)?;
    Ok(())
}

fn config() -> Result<ChunkingConfig, localrag_core::IngestError> {
    ChunkingConfig::new(200, 50)
}

#[test]
fn two_page_document_yields_one_chunk_per_page() -> TestResult {
    let dir = tempdir()?;
    write_pdf(&dir.path().join("x.pdf"), &["alpha page text", "beta page text"])?;

    let chunks: Vec<DocumentChunk> = produce_chunks(dir.path(), config()?)
        .collect::<Result<_, _>>()
        .map_err(|skipped| skipped.to_string())?;

    assert_eq!(chunks.len(), 2);
    assert_eq!((chunks[0].source.as_str(), chunks[0].page), ("x.pdf", 1));
    assert_eq!((chunks[1].source.as_str(), chunks[1].page), ("x.pdf", 2));
    assert!(chunks[0].text.contains("alpha page text"));
    assert!(chunks[1].text.contains("beta page text"));
    Ok(())
}

#[test]
fn documents_are_read_in_name_order() -> TestResult {
    let dir = tempdir()?;
    write_pdf(&dir.path().join("b.pdf"), &["from b"])?;
    write_pdf(&dir.path().join("a.pdf"), &["from a"])?;

    let names: Vec<_> = list_documents(dir.path())
        .iter()
        .filter_map(|path| path.file_name().and_then(|name| name.to_str()).map(String::from))
        .collect();
    assert_eq!(names, vec!["a.pdf", "b.pdf"]);

    let sources: Vec<_> = produce_chunks(dir.path(), config()?)
        .filter_map(Result::ok)
        .map(|chunk| chunk.source)
        .collect();
    assert_eq!(sources, vec!["a.pdf", "b.pdf"]);
    Ok(())
}

#[tokio::test]
async fn pipeline_streams_chunks_into_qdrant() -> TestResult {
    let dir = tempdir()?;
    write_pdf(&dir.path().join("x.pdf"), &["alpha page text", "beta page text"])?;
    std::fs::write(dir.path().join("y.pdf"), b"%PDF-1.4\n%broken")?;

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/docs"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/collections/docs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": true })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/collections/docs/index"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": {} })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/collections/docs/points"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = VectorStoreAdapter::new(
        QdrantStore::new(server.uri(), "docs"),
        CharacterNgramEmbedder::default(),
    );
    let report = adapter.ingest(produce_chunks(dir.path(), config()?)).await?;

    assert_eq!(report.stored, 2);
    assert_eq!(report.skipped_files.len(), 1);
    assert!(report.skipped_files[0].path.ends_with("y.pdf"));

    let requests = server.received_requests().await.unwrap_or_default();
    let upsert = requests
        .iter()
        .find(|request| request.url.path() == "/collections/docs/points")
        .ok_or("no upsert request")?;
    let body: Value = upsert.body_json()?;
    let pages: Vec<_> = body["points"]
        .as_array()
        .map(|points| points.iter().map(|point| point["payload"]["page"].clone()).collect())
        .unwrap_or_default();
    assert_eq!(pages, vec![json!(1), json!(2)]);
    Ok(())
}

#[tokio::test]
async fn empty_folder_stores_nothing_and_sends_nothing() -> TestResult {
    let dir = tempdir()?;
    let server = MockServer::start().await;

    let adapter = VectorStoreAdapter::new(
        QdrantStore::new(server.uri(), "docs"),
        CharacterNgramEmbedder::default(),
    );
    let report = adapter.ingest(produce_chunks(dir.path(), config()?)).await?;

    assert_eq!(report.stored, 0);
    assert!(report.skipped_files.is_empty());
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
    Ok(())
}
