use crate::config::{http_client, Settings};
use crate::embeddings::{Embedder, HuggingFaceEmbedder};
use crate::error::{RagError, Result};
use crate::generator::{Generator, GroqClient};
use crate::prompt::PromptTemplate;
use crate::retriever::Retriever;
use crate::store;
use log::info;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// The wired query pipeline: retrieve -> render prompt -> generate
pub struct RagChain {
    retriever: Retriever,
    prompt: PromptTemplate,
    generator: Arc<dyn Generator>,
}

impl RagChain {
    pub fn new(
        retriever: Retriever,
        prompt: PromptTemplate,
        generator: Arc<dyn Generator>,
    ) -> Self {
        RagChain {
            retriever,
            prompt,
            generator,
        }
    }

    /// Construct every remote handle the query path needs
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = http_client(settings.http_timeout)?;

        let embedder: Arc<dyn Embedder> = Arc::new(HuggingFaceEmbedder::new(
            settings.embedder.clone(),
            client.clone(),
        ));
        let store = store::connect(&settings.store, client.clone(), embedder.dimensions())?;
        let generator = Arc::new(GroqClient::new(settings.generator.clone(), client));

        info!(
            "RAG chain ready: embeddings {} via {}, generator {}",
            embedder.model(),
            store.backend(),
            generator.model()
        );

        Ok(RagChain::new(
            Retriever::new(embedder, store, settings.retrieval),
            PromptTemplate::default(),
            generator,
        ))
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer one question. Each stage runs once; the first failure is returned.
    pub async fn invoke(&self, question: &str) -> Result<String> {
        let question = validate_question(question)?;

        let context = self.retriever.retrieve_text(question).await?;
        let messages = self.prompt.render(&context, question);

        self.generator.generate(&messages).await
    }
}

/// Trimmed question, or `InvalidInput` when nothing is left
pub fn validate_question(question: &str) -> Result<&str> {
    let question = question.trim();
    if question.is_empty() {
        return Err(RagError::InvalidInput(
            "Question cannot be empty".to_string(),
        ));
    }
    Ok(question)
}

/// Holds the query pipeline once it has been built.
///
/// Concurrent first callers wait for a single build. A failed build leaves
/// the cache empty, so the next call builds again from scratch. A built
/// chain is never replaced.
pub struct ChainCache {
    cell: OnceCell<Arc<RagChain>>,
}

impl ChainCache {
    pub const fn new() -> Self {
        ChainCache {
            cell: OnceCell::const_new(),
        }
    }

    /// The cached chain, building it with `build` if the cache is empty
    pub async fn get_or_build<F, Fut>(&self, build: F) -> Result<Arc<RagChain>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RagChain>>,
    {
        self.cell
            .get_or_try_init(move || async move { build().await.map(Arc::new) })
            .await
            .cloned()
    }

    /// The cached chain, building it from the environment if needed
    pub async fn get_chain(&self) -> Result<Arc<RagChain>> {
        self.get_or_build(|| async {
            info!("Building RAG chain");
            let settings = Settings::from_env()?;
            RagChain::from_settings(&settings)
        })
        .await
    }

    pub fn is_built(&self) -> bool {
        self.cell.initialized()
    }
}

impl Default for ChainCache {
    fn default() -> Self {
        Self::new()
    }
}

static CHAIN_CACHE: ChainCache = ChainCache::new();

/// The process-wide query pipeline
pub async fn get_chain() -> Result<Arc<RagChain>> {
    CHAIN_CACHE.get_chain().await
}

/// Answer a question about the indexed textbook.
///
/// Blank questions are rejected before any configuration is read or any
/// request is sent.
pub async fn ask_question(question: &str) -> Result<String> {
    let question = validate_question(question)?;
    let chain = get_chain().await?;
    chain.invoke(question).await
}
