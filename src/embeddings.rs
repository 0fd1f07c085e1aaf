use crate::config::EmbedderConfig;
use crate::error::{RagError, Result};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

/// Texts sent per request to the embedding service
const EMBED_BATCH_SIZE: usize = 32;

/// Representation of a vector embedding
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn dimensions(&self) -> usize {
        self.values.len()
    }
}

/// Maps text to fixed-dimension vectors.
///
/// Ingestion and querying must go through embedders built from the same
/// [`EmbedderConfig`], otherwise similarity scores mean nothing.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model reference the vectors come from
    fn model(&self) -> &str;

    /// Length of every vector this embedder produces
    fn dimensions(&self) -> usize;

    /// Embed several texts, preserving order
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::EmbeddingFailure("No embedding returned".to_string()))
    }
}

/// Reject vectors whose length differs from the embedder's dimension
pub fn ensure_dimensions(expected: usize, embedding: &Embedding) -> Result<()> {
    if embedding.dimensions() != expected {
        return Err(RagError::EmbeddingFailure(format!(
            "Expected a {}-dimensional embedding, got {}",
            expected,
            embedding.dimensions()
        )));
    }
    Ok(())
}

/// Client for the Hugging Face feature-extraction endpoint
#[derive(Clone)]
pub struct HuggingFaceEmbedder {
    config: EmbedderConfig,
    client: reqwest::Client,
}

impl HuggingFaceEmbedder {
    pub fn new(config: EmbedderConfig, client: reqwest::Client) -> Self {
        HuggingFaceEmbedder { config, client }
    }

    async fn request_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        #[derive(Serialize)]
        struct Options {
            wait_for_model: bool,
        }

        #[derive(Serialize)]
        struct FeatureExtractionRequest<'a> {
            inputs: &'a [&'a str],
            options: Options,
        }

        let request = FeatureExtractionRequest {
            inputs: texts,
            options: Options {
                wait_for_model: true,
            },
        };

        let builder = self.client.post(&self.config.url).json(&request);
        let builder = if let Some(token) = &self.config.api_token {
            builder.bearer_auth(token)
        } else {
            builder
        };

        let response = builder
            .send()
            .await
            .map_err(|e| RagError::EmbeddingFailure(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RagError::EmbeddingFailure(format!(
                "API request failed: {} {}",
                status, error_text
            )));
        }

        let vectors: Vec<Vec<f32>> = response
            .json()
            .await
            .map_err(|e| RagError::EmbeddingFailure(format!("Malformed response: {}", e)))?;

        if vectors.len() != texts.len() {
            return Err(RagError::EmbeddingFailure(format!(
                "Requested {} embeddings, received {}",
                texts.len(),
                vectors.len()
            )));
        }

        vectors
            .into_iter()
            .map(|values| {
                let embedding = Embedding { values };
                ensure_dimensions(self.config.dimensions, &embedding)?;
                Ok(embedding)
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    fn model(&self) -> &str {
        self.config.model
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            debug!(
                "Embedding batch of {} texts with {}",
                batch.len(),
                self.config.model
            );
            embeddings.extend(self.request_batch(batch).await?);
        }

        Ok(embeddings)
    }
}
