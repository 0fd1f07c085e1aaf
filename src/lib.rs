pub mod chain;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod generator;
pub mod ingest;
pub mod prompt;
pub mod retriever;
pub mod store;

pub use chain::{ask_question, get_chain, ChainCache, RagChain};
pub use error::{RagError, Result};
pub use ingest::{IngestReport, Ingestor};
