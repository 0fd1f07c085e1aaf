use crate::chunking::ChunkingConfig;
use crate::error::{RagError, Result};
use log::{debug, info};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Sentence-transformers model shared by ingestion and querying
pub const EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
/// Output dimension of [`EMBEDDING_MODEL`]
pub const EMBEDDING_DIMENSIONS: usize = 384;
const DEFAULT_EMBEDDING_URL: &str = "https://router.huggingface.co/hf-inference/models/sentence-transformers/all-MiniLM-L6-v2/pipeline/feature-extraction";

pub const GENERATOR_MODEL: &str = "llama-3.3-70b-versatile";
pub const GENERATOR_TEMPERATURE: f32 = 0.2;
const DEFAULT_GENERATOR_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Table (or collection) holding the indexed passages
pub const PASSAGE_TABLE: &str = "documents";
/// Similarity query function registered next to [`PASSAGE_TABLE`]
pub const MATCH_FUNCTION: &str = "match_documents";

pub const DEFAULT_MATCH_COUNT: usize = 5;
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.3;

/// Supabase keys of this class can only read public data
const PUBLISHABLE_KEY_PREFIX: &str = "sb_publishable_";

/// Which vector store backend holds the passages
#[derive(Clone, Debug, PartialEq)]
pub enum StoreConfig {
    Supabase {
        url: String,
        service_key: String,
    },
    Qdrant {
        url: String,
        api_key: Option<String>,
    },
}

impl StoreConfig {
    /// Read the store settings selected by `VECTOR_STORE`
    pub fn from_vars<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = optional(lookup, "VECTOR_STORE").unwrap_or_else(|| "supabase".to_string());

        match backend.to_lowercase().as_str() {
            "supabase" => Ok(StoreConfig::Supabase {
                url: required_url(lookup, "SUPABASE_URL")?,
                service_key: required(lookup, "SUPABASE_SERVICE_KEY")?,
            }),
            "qdrant" => Ok(StoreConfig::Qdrant {
                url: required_url(lookup, "QDRANT_URL")?,
                api_key: optional(lookup, "QDRANT_API_KEY"),
            }),
            other => Err(RagError::Configuration(format!(
                "VECTOR_STORE must be 'supabase' or 'qdrant', got '{}'",
                other
            ))),
        }
    }

    /// Writing passages needs a privileged credential
    pub fn ensure_writable(&self) -> Result<()> {
        if let StoreConfig::Supabase { service_key, .. } = self {
            if service_key.starts_with(PUBLISHABLE_KEY_PREFIX) {
                return Err(RagError::Configuration(
                    "SUPABASE_SERVICE_KEY is set to a publishable key. Use your Supabase secret/service_role key for ingestion."
                        .to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Configuration for the embedding service
#[derive(Clone, Debug, PartialEq)]
pub struct EmbedderConfig {
    pub url: String,
    pub api_token: Option<String>,
    pub model: &'static str,
    pub dimensions: usize,
}

impl EmbedderConfig {
    pub fn from_vars<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = match optional(lookup, "EMBEDDING_URL") {
            Some(_) => required_url(lookup, "EMBEDDING_URL")?,
            None => DEFAULT_EMBEDDING_URL.to_string(),
        };

        Ok(EmbedderConfig {
            url,
            api_token: optional(lookup, "HF_API_TOKEN"),
            model: EMBEDDING_MODEL,
            dimensions: EMBEDDING_DIMENSIONS,
        })
    }
}

/// Configuration for the chat-completion model
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorConfig {
    pub api_key: String,
    pub url: String,
    pub model: &'static str,
    pub temperature: f32,
}

impl GeneratorConfig {
    pub fn from_vars<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = required(lookup, "GROQ_API_KEY")?;
        let url = match optional(lookup, "GROQ_API_URL") {
            Some(_) => required_url(lookup, "GROQ_API_URL")?,
            None => DEFAULT_GENERATOR_URL.to_string(),
        };

        Ok(GeneratorConfig {
            api_key,
            url,
            model: GENERATOR_MODEL,
            temperature: GENERATOR_TEMPERATURE,
        })
    }
}

/// Parameters of the `match_documents` similarity query
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetrievalConfig {
    pub match_count: usize,
    pub match_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        RetrievalConfig {
            match_count: DEFAULT_MATCH_COUNT,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

/// Everything the query pipeline needs
#[derive(Clone, Debug)]
pub struct Settings {
    pub store: StoreConfig,
    pub embedder: EmbedderConfig,
    pub generator: GeneratorConfig,
    pub retrieval: RetrievalConfig,
    pub http_timeout: Option<Duration>,
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Settings {
            store: StoreConfig::from_vars(&lookup)?,
            embedder: EmbedderConfig::from_vars(&lookup)?,
            generator: GeneratorConfig::from_vars(&lookup)?,
            retrieval: RetrievalConfig::default(),
            http_timeout: http_timeout(&lookup)?,
        })
    }
}

/// Everything the ingestion pipeline needs
#[derive(Clone, Debug)]
pub struct IngestSettings {
    pub store: StoreConfig,
    pub embedder: EmbedderConfig,
    pub chunking: ChunkingConfig,
    pub http_timeout: Option<Duration>,
}

impl IngestSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Fails before any client exists if the store credential cannot write
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = StoreConfig::from_vars(&lookup)?;
        store.ensure_writable()?;

        Ok(IngestSettings {
            store,
            embedder: EmbedderConfig::from_vars(&lookup)?,
            chunking: ChunkingConfig::default(),
            http_timeout: http_timeout(&lookup)?,
        })
    }
}

/// Load the nearest `.env` walking up from the current directory
pub fn load_dotenv() -> Option<PathBuf> {
    let current = env::current_dir().ok()?;
    let env_file = current
        .ancestors()
        .map(|dir| dir.join(".env"))
        .find(|candidate| candidate.is_file())?;

    match dotenv::from_path(&env_file) {
        Ok(()) => {
            info!("Loaded environment from {}", env_file.display());
            Some(env_file)
        }
        Err(e) => {
            debug!("Ignoring unreadable {}: {}", env_file.display(), e);
            None
        }
    }
}

/// Build the HTTP client shared by one pipeline's remote stages
pub fn http_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let builder = reqwest::Client::builder();
    let builder = if let Some(timeout) = timeout {
        builder.timeout(timeout)
    } else {
        builder
    };

    builder
        .build()
        .map_err(|e| RagError::Configuration(format!("Failed to build HTTP client: {}", e)))
}

fn optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required<F>(lookup: &F, name: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, name).ok_or_else(|| RagError::Configuration(format!("Missing {}", name)))
}

fn required_url<F>(lookup: &F, name: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let url = required(lookup, name)?;
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(RagError::Configuration(format!(
            "{} must be an http(s) URL, got '{}'",
            name, url
        )));
    }
    Ok(url.trim_end_matches('/').to_string())
}

fn http_timeout<F>(lookup: &F) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, "RAG_HTTP_TIMEOUT_SECS")
        .map(|raw| {
            raw.parse::<u64>().map(Duration::from_secs).map_err(|_| {
                RagError::Configuration(format!(
                    "RAG_HTTP_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                    raw
                ))
            })
        })
        .transpose()
}
