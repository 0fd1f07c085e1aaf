use super::{MatchRow, NewPassage, TextField, VectorStore};
use crate::config::PASSAGE_TABLE;
use crate::embeddings::Embedding;
use crate::error::{RagError, Result};
use async_trait::async_trait;
use log::{debug, info};
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, ScoredPoint, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;
use uuid::Uuid;

/// Passage collection in a Qdrant instance
pub struct QdrantStore {
    client: Qdrant,
    dimensions: u64,
}

impl QdrantStore {
    /// Create a new Qdrant client
    pub fn new(url: &str, api_key: Option<String>, dimensions: usize) -> Result<Self> {
        let config_builder = Qdrant::from_url(url);
        let config_builder = if let Some(api_key) = api_key {
            config_builder.api_key(api_key)
        } else {
            config_builder
        };

        let client = config_builder.build().map_err(|e| {
            RagError::Configuration(format!("Failed to initialize Qdrant client: {}", e))
        })?;

        Ok(QdrantStore {
            client,
            dimensions: dimensions as u64,
        })
    }

    async fn collection_exists(&self) -> std::result::Result<bool, qdrant_client::QdrantError> {
        self.client.collection_exists(PASSAGE_TABLE).await
    }

    /// Create the passage collection on first write
    async fn ensure_collection(&self) -> Result<()> {
        let exists = self.collection_exists().await.map_err(|e| {
            RagError::StorageWriteFailure(format!("Failed to check collection: {}", e))
        })?;
        if exists {
            return Ok(());
        }

        info!(
            "Creating collection {} ({} dimensions)",
            PASSAGE_TABLE, self.dimensions
        );
        let create_collection = CreateCollectionBuilder::new(PASSAGE_TABLE)
            .vectors_config(VectorParamsBuilder::new(self.dimensions, Distance::Cosine));

        self.client
            .create_collection(create_collection)
            .await
            .map_err(|e| {
                RagError::StorageWriteFailure(format!(
                    "Failed to create collection {}: {}",
                    PASSAGE_TABLE, e
                ))
            })?;

        Ok(())
    }
}

/// Every passage becomes a new point under a fresh id; stored points are never overwritten
fn to_point(passage: &NewPassage) -> Result<PointStruct> {
    let payload = Payload::try_from(json!({
        (TextField::Content.key()): passage.content,
        "metadata": passage.metadata,
    }))
    .map_err(|e| RagError::StorageWriteFailure(format!("Invalid payload: {}", e)))?;

    Ok(PointStruct::new(
        Uuid::new_v4().to_string(),
        passage.embedding.values.clone(),
        payload,
    ))
}

fn to_match_row(scored_point: ScoredPoint) -> MatchRow {
    let text_of = |field: TextField| {
        scored_point
            .payload
            .get(field.key())
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    };

    MatchRow {
        id: None,
        content: text_of(TextField::Content),
        page_content: text_of(TextField::PageContent),
        similarity: Some(scored_point.score),
        metadata: None,
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn backend(&self) -> &'static str {
        "qdrant"
    }

    async fn upsert(&self, passages: &[NewPassage]) -> Result<usize> {
        self.ensure_collection().await?;

        let points = passages
            .iter()
            .map(to_point)
            .collect::<Result<Vec<PointStruct>>>()?;

        let written = points.len();
        let upsert_request = UpsertPointsBuilder::new(PASSAGE_TABLE, points).wait(true);

        self.client
            .upsert_points(upsert_request)
            .await
            .map_err(|e| {
                RagError::StorageWriteFailure(format!(
                    "Failed to upsert points in collection {}: {}",
                    PASSAGE_TABLE, e
                ))
            })?;

        info!("Wrote {} passages to {}", written, PASSAGE_TABLE);
        Ok(written)
    }

    async fn match_documents(
        &self,
        query_embedding: &Embedding,
        match_threshold: f32,
        match_count: usize,
    ) -> Result<Vec<MatchRow>> {
        let exists = self
            .collection_exists()
            .await
            .map_err(|e| RagError::RetrievalFailure(format!("Failed to check collection: {}", e)))?;
        if !exists {
            debug!("Collection {} does not exist yet", PASSAGE_TABLE);
            return Ok(Vec::new());
        }

        let search_request = SearchPointsBuilder::new(
            PASSAGE_TABLE,
            query_embedding.values.clone(),
            match_count as u64,
        )
        .score_threshold(match_threshold)
        .with_payload(true);

        let search_response = self
            .client
            .search_points(search_request)
            .await
            .map_err(|e| {
                RagError::RetrievalFailure(format!(
                    "Failed to search collection {}: {}",
                    PASSAGE_TABLE, e
                ))
            })?;

        Ok(search_response
            .result
            .into_iter()
            .map(to_match_row)
            .collect())
    }
}
