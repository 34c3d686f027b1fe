//! Backend provider abstraction.
//!
//! The query engine talks to its embedding and generation backends through
//! the [`Provider`] trait. `OllamaProvider` is the real implementation;
//! `MockProvider` is a deterministic stand-in for tests and offline runs.

mod mock;
mod ollama;
mod types;

pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use types::{GenerateRequest, Provider, ProviderError, Result};
