#![allow(dead_code)]

pub mod http_stub;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use textbook_rag::config::RetrievalConfig;
use textbook_rag::embeddings::{Embedder, Embedding};
use textbook_rag::generator::Generator;
use textbook_rag::prompt::{ChatMessage, PromptTemplate};
use textbook_rag::retriever::Retriever;
use textbook_rag::store::{MatchRow, NewPassage, TextField, VectorStore};
use textbook_rag::{RagChain, RagError, Result};

/// One dimension per known word; unknown words are ignored
const VOCABULARY: &[&str] = &[
    "slope",
    "line",
    "rise",
    "run",
    "photosynthesis",
    "plants",
    "sunlight",
    "energy",
];

/// Deterministic bag-of-words embedder over [`VOCABULARY`]
#[derive(Default)]
pub struct KeywordEmbedder {
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector(text: &str) -> Vec<f32> {
        let mut values = vec![0.0; VOCABULARY.len()];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .map(|word| word.to_lowercase())
        {
            if let Some(idx) = VOCABULARY.iter().position(|known| *known == word) {
                values[idx] += 1.0;
            }
        }
        values
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model(&self) -> &str {
        "keyword-test-model"
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len()
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|text| Embedding {
                values: Self::vector(text),
            })
            .collect())
    }
}

/// Cosine-similarity store kept in memory
pub struct InMemoryStore {
    passages: Mutex<Vec<NewPassage>>,
    /// Field the rows expose their text under
    text_field: TextField,
    pub queries: AtomicUsize,
    fail_writes: bool,
    fail_queries: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_text_field(TextField::Content)
    }

    pub fn with_text_field(text_field: TextField) -> Self {
        InMemoryStore {
            passages: Mutex::new(Vec::new()),
            text_field,
            queries: AtomicUsize::new(0),
            fail_writes: false,
            fail_queries: false,
        }
    }

    pub fn failing_writes() -> Self {
        InMemoryStore {
            fail_writes: true,
            ..Self::new()
        }
    }

    pub fn failing_queries() -> Self {
        InMemoryStore {
            fail_queries: true,
            ..Self::new()
        }
    }

    pub fn passages(&self) -> Vec<NewPassage> {
        self.passages.lock().unwrap().clone()
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryStore {
    fn backend(&self) -> &'static str {
        "in-memory"
    }

    async fn upsert(&self, passages: &[NewPassage]) -> Result<usize> {
        if self.fail_writes {
            return Err(RagError::StorageWriteFailure(
                "permission denied for table documents".to_string(),
            ));
        }
        self.passages.lock().unwrap().extend_from_slice(passages);
        Ok(passages.len())
    }

    async fn match_documents(
        &self,
        query_embedding: &Embedding,
        match_threshold: f32,
        match_count: usize,
    ) -> Result<Vec<MatchRow>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries {
            return Err(RagError::RetrievalFailure(
                "function match_documents does not exist".to_string(),
            ));
        }

        let mut scored: Vec<(f32, String)> = self
            .passages
            .lock()
            .unwrap()
            .iter()
            .map(|passage| {
                (
                    cosine_similarity(&passage.embedding.values, &query_embedding.values),
                    passage.content.clone(),
                )
            })
            .filter(|(score, _)| *score > match_threshold)
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(match_count);

        Ok(scored
            .into_iter()
            .map(|(score, text)| {
                let mut row = MatchRow {
                    similarity: Some(score),
                    ..MatchRow::default()
                };
                match self.text_field {
                    TextField::Content => row.content = Some(text),
                    TextField::PageContent => row.page_content = Some(text),
                }
                row
            })
            .collect())
    }
}

/// Answers by quoting the context section of the prompt back
#[derive(Default)]
pub struct EchoGenerator {
    pub prompts: Mutex<Vec<Vec<ChatMessage>>>,
}

impl EchoGenerator {
    pub fn last_prompt(&self) -> Option<String> {
        self.prompts
            .lock()
            .unwrap()
            .last()
            .map(|messages| messages.iter().map(|m| m.content.clone()).collect())
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for EchoGenerator {
    fn model(&self) -> &str {
        "echo"
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        self.prompts.lock().unwrap().push(messages.to_vec());

        let prompt: String = messages.iter().map(|m| m.content.as_str()).collect();
        let context = prompt
            .split("Context:\n")
            .nth(1)
            .and_then(|rest| rest.split("\n\nQuestion:").next())
            .unwrap_or_default();

        Ok(format!("According to the textbook: {}", context))
    }
}

/// Always fails like an unauthorized API call
pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    fn model(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _messages: &[ChatMessage]) -> Result<String> {
        Err(RagError::GenerationFailure(
            "API request failed: 401 Unauthorized".to_string(),
        ))
    }
}

pub fn chain_with(
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn Generator>,
) -> RagChain {
    RagChain::new(
        Retriever::new(embedder, store, RetrievalConfig::default()),
        PromptTemplate::default(),
        generator,
    )
}
