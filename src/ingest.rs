use crate::chunking::{strip_null_chars, RecursiveSplitter};
use crate::config::{http_client, IngestSettings};
use crate::document::SourceDocument;
use crate::embeddings::{ensure_dimensions, Embedder, HuggingFaceEmbedder};
use crate::error::{RagError, Result};
use crate::store::{self, NewPassage, VectorStore};
use log::info;
use std::path::Path;
use std::sync::Arc;

/// Counts from one ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub pages: usize,
    pub chunks: usize,
    pub passages: usize,
}

/// Offline pipeline: load -> chunk -> clean -> embed -> upload.
///
/// The first failing stage aborts the run. Nothing tracks what was already
/// uploaded, and running twice on the same document stores every passage twice.
pub struct Ingestor {
    splitter: RecursiveSplitter,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl Ingestor {
    pub fn new(
        splitter: RecursiveSplitter,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Ingestor {
            splitter,
            embedder,
            store,
        }
    }

    /// Construct the remote handles the ingestion path needs
    pub fn from_settings(settings: &IngestSettings) -> Result<Self> {
        settings.store.ensure_writable()?;

        let client = http_client(settings.http_timeout)?;
        let embedder: Arc<dyn Embedder> = Arc::new(HuggingFaceEmbedder::new(
            settings.embedder.clone(),
            client.clone(),
        ));
        let store = store::connect(&settings.store, client, embedder.dimensions())?;

        Ok(Ingestor::new(
            RecursiveSplitter::new(settings.chunking)?,
            embedder,
            store,
        ))
    }

    pub async fn ingest_file<P: AsRef<Path>>(&self, file_path: P) -> Result<IngestReport> {
        info!("Loading {}...", file_path.as_ref().display());
        let document = SourceDocument::from_file(file_path)?;
        self.ingest_document(&document).await
    }

    pub async fn ingest_document(&self, document: &SourceDocument) -> Result<IngestReport> {
        let chunks = self.splitter.split_document(document);
        info!(
            "Split {} pages into {} chunks",
            document.pages.len(),
            chunks.len()
        );

        info!("Cleaning null characters from chunks...");
        let chunks = strip_null_chars(chunks);
        if chunks.is_empty() {
            return Err(RagError::source_unavailable(
                &document.source_id,
                "no text to index",
            ));
        }
        let chunk_count = chunks.len();

        info!(
            "Embedding {} chunks with {}...",
            chunk_count,
            self.embedder.model()
        );
        let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if embeddings.len() != chunk_count {
            return Err(RagError::EmbeddingFailure(format!(
                "Requested {} embeddings, received {}",
                chunk_count,
                embeddings.len()
            )));
        }
        for embedding in &embeddings {
            ensure_dimensions(self.embedder.dimensions(), embedding)?;
        }

        let passages: Vec<NewPassage> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| NewPassage::new(chunk, embedding))
            .collect();

        info!("Uploading to {}...", self.store.backend());
        let written = self.store.upsert(&passages).await?;

        Ok(IngestReport {
            pages: document.pages.len(),
            chunks: chunk_count,
            passages: written,
        })
    }
}
