use crate::chunking::TextChunk;
use crate::config::StoreConfig;
use crate::embeddings::Embedding;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod qdrant;
pub mod supabase;

pub use self::qdrant::QdrantStore;
pub use self::supabase::SupabaseStore;

/// Provenance stored next to each passage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageMetadata {
    pub source: String,
    pub page: usize,
    pub start_position: usize,
}

/// A passage ready to be written to the store
#[derive(Debug, Clone, PartialEq)]
pub struct NewPassage {
    pub content: String,
    pub embedding: Embedding,
    pub metadata: PassageMetadata,
}

impl NewPassage {
    pub fn new(chunk: TextChunk, embedding: Embedding) -> Self {
        NewPassage {
            metadata: PassageMetadata {
                source: chunk.source_id,
                page: chunk.page_number,
                start_position: chunk.start_position,
            },
            content: chunk.text,
            embedding,
        }
    }
}

/// Row fields that may hold the passage text, in lookup order.
/// Tables written by different ingestion runs use either name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Content,
    PageContent,
}

impl TextField {
    pub const ACCEPTED: [TextField; 2] = [TextField::Content, TextField::PageContent];

    pub fn key(self) -> &'static str {
        match self {
            TextField::Content => "content",
            TextField::PageContent => "page_content",
        }
    }
}

/// One row returned by the similarity query
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MatchRow {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub page_content: Option<String>,
    #[serde(default)]
    pub similarity: Option<f32>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl MatchRow {
    pub fn field(&self, field: TextField) -> Option<&str> {
        match field {
            TextField::Content => self.content.as_deref(),
            TextField::PageContent => self.page_content.as_deref(),
        }
    }

    /// First populated text field, following [`TextField::ACCEPTED`]
    pub fn text(&self) -> Option<&str> {
        TextField::ACCEPTED
            .iter()
            .find_map(|field| self.field(*field).filter(|text| !text.is_empty()))
    }
}

/// Persistent passage store with a similarity query
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend name used in logs
    fn backend(&self) -> &'static str;

    /// Bulk-insert passages and return how many were written.
    /// Not idempotent: writing the same passages twice stores them twice.
    async fn upsert(&self, passages: &[NewPassage]) -> Result<usize>;

    /// Rows scoring above `match_threshold`, best first, at most `match_count`
    async fn match_documents(
        &self,
        query_embedding: &Embedding,
        match_threshold: f32,
        match_count: usize,
    ) -> Result<Vec<MatchRow>>;
}

/// Open the configured store backend
pub fn connect(
    config: &StoreConfig,
    client: reqwest::Client,
    dimensions: usize,
) -> Result<Arc<dyn VectorStore>> {
    match config {
        StoreConfig::Supabase { url, service_key } => Ok(Arc::new(SupabaseStore::new(
            url.clone(),
            service_key.clone(),
            client,
        ))),
        StoreConfig::Qdrant { url, api_key } => Ok(Arc::new(QdrantStore::new(
            url,
            api_key.clone(),
            dimensions,
        )?)),
    }
}
