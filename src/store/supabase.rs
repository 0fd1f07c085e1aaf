use super::{MatchRow, NewPassage, PassageMetadata, VectorStore};
use crate::config::{MATCH_FUNCTION, PASSAGE_TABLE};
use crate::embeddings::Embedding;
use crate::error::{RagError, Result};
use async_trait::async_trait;
use log::{debug, info};
use serde::Serialize;

/// Rows per insert request
const UPLOAD_BATCH_SIZE: usize = 500;

/// Passage table behind Supabase's PostgREST API
pub struct SupabaseStore {
    url: String,
    service_key: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct PassageRow<'a> {
    content: &'a str,
    embedding: &'a [f32],
    metadata: &'a PassageMetadata,
}

#[derive(Serialize)]
struct MatchParams<'a> {
    query_embedding: &'a [f32],
    match_threshold: f32,
    match_count: usize,
}

impl SupabaseStore {
    pub fn new(url: String, service_key: String, client: reqwest::Client) -> Self {
        SupabaseStore {
            url,
            service_key,
            client,
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/rest/v1/{}", self.url, path))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }
}

/// Turn a non-success response into its status and body text
async fn failure_text(response: reqwest::Response) -> String {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    format!("{} {}", status, error_text)
}

#[async_trait]
impl VectorStore for SupabaseStore {
    fn backend(&self) -> &'static str {
        "supabase"
    }

    async fn upsert(&self, passages: &[NewPassage]) -> Result<usize> {
        let mut written = 0;

        for batch in passages.chunks(UPLOAD_BATCH_SIZE) {
            let rows: Vec<PassageRow> = batch
                .iter()
                .map(|passage| PassageRow {
                    content: &passage.content,
                    embedding: &passage.embedding.values,
                    metadata: &passage.metadata,
                })
                .collect();

            let response = self
                .post(PASSAGE_TABLE)
                .header("Prefer", "return=minimal")
                .json(&rows)
                .send()
                .await
                .map_err(|e| RagError::StorageWriteFailure(e.to_string()))?;

            if !response.status().is_success() {
                return Err(RagError::StorageWriteFailure(format!(
                    "Insert into {} failed: {}",
                    PASSAGE_TABLE,
                    failure_text(response).await
                )));
            }

            written += rows.len();
            debug!("Uploaded {}/{} passages", written, passages.len());
        }

        info!("Wrote {} passages to {}", written, PASSAGE_TABLE);
        Ok(written)
    }

    async fn match_documents(
        &self,
        query_embedding: &Embedding,
        match_threshold: f32,
        match_count: usize,
    ) -> Result<Vec<MatchRow>> {
        let params = MatchParams {
            query_embedding: &query_embedding.values,
            match_threshold,
            match_count,
        };

        let response = self
            .post(&format!("rpc/{}", MATCH_FUNCTION))
            .json(&params)
            .send()
            .await
            .map_err(|e| RagError::RetrievalFailure(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RagError::RetrievalFailure(format!(
                "{} failed: {}",
                MATCH_FUNCTION,
                failure_text(response).await
            )));
        }

        // PostgREST answers `null` for functions returning no set
        let rows: Option<Vec<MatchRow>> = response
            .json()
            .await
            .map_err(|e| RagError::RetrievalFailure(format!("Malformed response: {}", e)))?;

        Ok(rows.unwrap_or_default())
    }
}
