//! Retrieval-augmented question answering.
//!
//! The pipeline has two phases:
//!
//! 1. **Index build** (startup, blocking): read every file from the
//!    document folder, split into overlapping chunks, embed each chunk,
//!    and fill the in-memory vector store. Any failure here is fatal;
//!    the service never starts with a partial index.
//! 2. **Answering**: embed the question, retrieve the top-k most similar
//!    chunks, render the fixed prompt template around them, and ask the
//!    generation backend for the final text.
//!
//! Documents added to the folder after startup are invisible until the
//! process is restarted; there is no incremental update path.

mod chunk;
mod embedder;
mod loader;
pub mod prompt;
mod store;
mod types;

pub use embedder::EmbedderError;
pub use loader::LoaderError;
pub use types::{Document, SearchResult};

use crate::config::Config;
use crate::provider::{GenerateRequest, Provider, ProviderError};
use embedder::Embedder;
use std::path::Path;
use std::sync::Arc;
use store::{MemoryStore, VectorStore};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum EngineError {
    /// The question was empty or missing. Rejected before any backend call.
    #[error("No query provided")]
    EmptyQuestion,

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error("Embedder error: {0}")]
    Embedder(#[from] EmbedderError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// The query-answering engine: a built index plus its backends.
pub struct QueryEngine {
    embedder: Embedder,
    store: Arc<dyn VectorStore>,
    provider: Arc<dyn Provider>,
    llm_model: String,
    temperature: f64,
    top_k: usize,
    document_count: usize,
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("llm_model", &self.llm_model)
            .field("temperature", &self.temperature)
            .field("top_k", &self.top_k)
            .field("document_count", &self.document_count)
            .finish_non_exhaustive()
    }
}

impl QueryEngine {
    /// Builds the index from the configured document folder.
    ///
    /// Runs once at startup, single pass, before any traffic is served.
    /// Fails fast if the folder is missing or either backend rejects its
    /// model name.
    pub async fn build(config: &Config, provider: Arc<dyn Provider>) -> Result<Self> {
        let embedder = Embedder::new(provider.clone(), config.rag.embedding_model.clone());
        let store: Arc<dyn VectorStore> = Arc::new(MemoryStore::new());

        let documents = loader::load_dir(Path::new(&config.service.data_dir)).await?;
        let document_count = documents.len();
        info!(documents = document_count, "Loaded document folder");

        for doc in &documents {
            let chunks =
                chunk::chunk_text(&doc.content, config.rag.chunk_size, config.rag.chunk_overlap);

            let mut indexed = Vec::with_capacity(chunks.len());
            for (i, chunk) in chunks.into_iter().enumerate() {
                let embedding = embedder.embed(&chunk).await?;
                indexed.push(
                    Document::new(format!("{}_chunk_{}", doc.name, i), chunk, embedding)
                        .with_metadata("source", &doc.name)
                        .with_metadata("chunk", i.to_string()),
                );
            }

            let chunk_count = indexed.len();
            store.add(indexed).await;
            info!(document = %doc.name, chunks = chunk_count, "Indexed");
        }

        Ok(Self {
            embedder,
            store,
            provider,
            llm_model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            top_k: config.rag.top_k,
            document_count,
        })
    }

    /// Answers a question against the indexed documents.
    ///
    /// Empty questions are rejected without touching the index or either
    /// backend. Backend failures propagate to the caller; there is no
    /// retry and no caching.
    pub async fn answer(&self, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(EngineError::EmptyQuestion);
        }

        let query_embedding = self.embedder.embed(question).await?;
        let results = self.store.search(&query_embedding, self.top_k).await;
        debug!(retrieved = results.len(), "Retrieved context chunks");

        let context = prompt::format_context(&results);
        let rendered = prompt::render(question, &context);

        let request =
            GenerateRequest::new(&self.llm_model, rendered).with_temperature(self.temperature);
        let answer = self.provider.generate(request).await?;

        Ok(answer)
    }

    /// Number of source files in the index.
    pub fn document_count(&self) -> usize {
        self.document_count
    }

    /// Number of indexed chunks.
    pub async fn chunk_count(&self) -> usize {
        self.store.count().await
    }
}
