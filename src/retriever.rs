use crate::config::RetrievalConfig;
use crate::embeddings::{ensure_dimensions, Embedder};
use crate::error::Result;
use crate::store::{MatchRow, VectorStore};
use log::{debug, info};
use std::sync::Arc;

/// Context handed to the prompt when nothing relevant was found
pub const NO_CONTEXT_FOUND: &str = "No relevant textbook context found.";

/// Outcome of a similarity lookup
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievedContext {
    /// Passage texts in store order
    Passages(Vec<String>),
    NotFound,
}

impl RetrievedContext {
    /// Keep the rows that carry text; no such rows means [`RetrievedContext::NotFound`]
    pub fn from_rows(rows: &[MatchRow]) -> Self {
        let passages: Vec<String> = rows
            .iter()
            .filter_map(|row| row.text())
            .map(|text| text.to_string())
            .collect();

        if passages.is_empty() {
            RetrievedContext::NotFound
        } else {
            RetrievedContext::Passages(passages)
        }
    }

    /// Text for the prompt's context slot; never empty
    pub fn to_prompt_text(&self) -> String {
        match self {
            RetrievedContext::Passages(passages) => passages.join("\n\n"),
            RetrievedContext::NotFound => NO_CONTEXT_FOUND.to_string(),
        }
    }
}

/// Embeds a question and looks up the closest passages
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        config: RetrievalConfig,
    ) -> Self {
        Retriever {
            embedder,
            store,
            config,
        }
    }

    pub async fn retrieve(&self, question: &str) -> Result<RetrievedContext> {
        let query_embedding = self.embedder.embed(question).await?;
        ensure_dimensions(self.embedder.dimensions(), &query_embedding)?;

        let rows = self
            .store
            .match_documents(
                &query_embedding,
                self.config.match_threshold,
                self.config.match_count,
            )
            .await?;
        debug!("{} returned {} rows", self.store.backend(), rows.len());

        let context = RetrievedContext::from_rows(&rows);
        if let RetrievedContext::Passages(passages) = &context {
            info!("Retrieved {} passages", passages.len());
        } else {
            info!("No passage above the similarity threshold");
        }

        Ok(context)
    }

    /// Retrieve and render straight into the prompt's context text
    pub async fn retrieve_text(&self, question: &str) -> Result<String> {
        Ok(self.retrieve(question).await?.to_prompt_text())
    }
}
