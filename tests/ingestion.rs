mod common;

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use common::{chain_with, EchoGenerator, InMemoryStore, KeywordEmbedder};
use textbook_rag::chunking::{ChunkingConfig, RecursiveSplitter};
use textbook_rag::config::IngestSettings;
use textbook_rag::document::SourceDocument;
use textbook_rag::{IngestReport, Ingestor, RagError};

fn ingestor(embedder: Arc<KeywordEmbedder>, store: Arc<InMemoryStore>) -> Ingestor {
    Ingestor::new(
        RecursiveSplitter::new(ChunkingConfig::default()).unwrap(),
        embedder,
        store,
    )
}

fn two_page_textbook() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("algebra")
        .suffix(".txt")
        .tempfile()
        .unwrap();
    write!(
        file,
        "The slope of a line is rise over run.\x0cPhotosynthesis lets plants turn sunlight into energy."
    )
    .unwrap();
    file
}

#[tokio::test]
async fn test_two_page_document_end_to_end() {
    let embedder = Arc::new(KeywordEmbedder::default());
    let store = Arc::new(InMemoryStore::new());
    let file = two_page_textbook();

    let report = ingestor(embedder.clone(), store.clone())
        .ingest_file(file.path())
        .await
        .unwrap();

    assert_eq!(
        report,
        IngestReport {
            pages: 2,
            chunks: 2,
            passages: 2
        }
    );
    let pages: Vec<usize> = store.passages().iter().map(|p| p.metadata.page).collect();
    assert_eq!(pages, vec![1, 2]);

    let generator = Arc::new(EchoGenerator::default());
    let chain = chain_with(embedder, store, generator.clone());

    let context = chain
        .retriever()
        .retrieve_text("What is slope?")
        .await
        .unwrap();
    assert_eq!(context, "The slope of a line is rise over run.");

    let answer = chain.invoke("What is slope?").await.unwrap();
    assert!(answer.contains("rise over run"));
    assert!(!answer.contains("Photosynthesis"));
}

#[tokio::test]
async fn test_null_characters_never_reach_the_store() {
    let store = Arc::new(InMemoryStore::new());
    let document = SourceDocument::from_pages(
        "algebra.pdf",
        ["The slope\0 of a line is rise\0 over run."],
    );

    ingestor(Arc::new(KeywordEmbedder::default()), store.clone())
        .ingest_document(&document)
        .await
        .unwrap();

    let passages = store.passages();
    assert_eq!(passages.len(), 1);
    assert_eq!(passages[0].content, "The slope of a line is rise over run.");
    assert!(!passages[0].content.contains('\0'));
}

#[tokio::test]
async fn test_long_pages_are_chunked_within_limits() {
    let store = Arc::new(InMemoryStore::new());
    let page = "A line with positive slope rises from left to right. ".repeat(60);
    let document = SourceDocument::from_pages("algebra.txt", [page]);

    let report = ingestor(Arc::new(KeywordEmbedder::default()), store.clone())
        .ingest_document(&document)
        .await
        .unwrap();

    assert!(report.chunks > 3);
    assert_eq!(report.passages, report.chunks);
    for passage in store.passages() {
        assert!(passage.content.chars().count() <= 1000);
    }
}

#[tokio::test]
async fn test_reingesting_duplicates_passages() {
    let store = Arc::new(InMemoryStore::new());
    let ingestor = ingestor(Arc::new(KeywordEmbedder::default()), store.clone());
    let file = two_page_textbook();

    ingestor.ingest_file(file.path()).await.unwrap();
    ingestor.ingest_file(file.path()).await.unwrap();

    assert_eq!(store.passages().len(), 4);
}

#[tokio::test]
async fn test_missing_source_aborts_before_embedding() {
    let embedder = Arc::new(KeywordEmbedder::default());
    let store = Arc::new(InMemoryStore::new());
    let dir = tempfile::tempdir().unwrap();

    let err = ingestor(embedder.clone(), store.clone())
        .ingest_file(dir.path().join("ck12_basic_algebra.pdf"))
        .await
        .unwrap_err();

    assert!(matches!(err, RagError::SourceUnavailable { .. }));
    assert_eq!(embedder.calls(), 0);
    assert!(store.passages().is_empty());
}

#[tokio::test]
async fn test_storage_failure_aborts_the_run() {
    let file = two_page_textbook();

    let err = ingestor(
        Arc::new(KeywordEmbedder::default()),
        Arc::new(InMemoryStore::failing_writes()),
    )
    .ingest_file(file.path())
    .await
    .unwrap_err();

    assert!(matches!(err, RagError::StorageWriteFailure(_)));
}

#[test]
fn test_publishable_key_is_rejected_before_upload() {
    let vars: HashMap<&str, &str> = [
        ("SUPABASE_URL", "https://project.supabase.co"),
        ("SUPABASE_SERVICE_KEY", "sb_publishable_abc123"),
    ]
    .into_iter()
    .collect();

    let err = IngestSettings::from_vars(|name| vars.get(name).map(|v| v.to_string())).unwrap_err();

    assert!(matches!(err, RagError::Configuration(_)));
}
