//! askdoc-core - shared infrastructure for the askdoc document QA system
//!
//! Provides the pieces both askdoc binaries build on:
//! - Configuration management
//! - Ollama daemon detection
//! - Backend provider abstraction (embedding + generation)
//! - RAG pipeline (document loading, chunking, in-memory index, query engine)

pub mod config;
pub mod detection;
pub mod provider;
pub mod rag;

pub use config::{Config, ConfigError, LlmConfig, RagConfig, ServiceConfig};
pub use detection::{check_ollama_silent, detect_ollama, DetectionError};
pub use provider::{GenerateRequest, MockProvider, OllamaProvider, Provider, ProviderError};
pub use rag::{EngineError, QueryEngine};
