use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration for the whole askdoc system.
///
/// Both binaries load the same file: the server reads the LLM and RAG
/// sections to build its index, the panel reads the service section to
/// find the document folder and the server address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

/// Configuration for the generation backend (Ollama).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model name resolved by the Ollama daemon (e.g. "llama2:13b-chat").
    pub model: String,
    pub base_url: String,
    pub temperature: f64,
    /// Passed to the HTTP client. Generation against large local models is
    /// slow; the daemon-side budget is minutes, not seconds.
    pub request_timeout_secs: u64,
}

/// Configuration for retrieval: embedding model and chunking behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Embedding model name resolved by the Ollama daemon.
    pub embedding_model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per question.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

/// Configuration for the query service process itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Flat folder of source documents, indexed once at startup.
    pub data_dir: String,
    pub bind_addr: String,
    /// How long the panel waits for graceful shutdown before force-killing.
    pub grace_period_secs: u64,
}

fn default_top_k() -> usize {
    5
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "llama2:13b-chat".to_string(),
            base_url: "http://localhost:11434".to_string(),
            temperature: 0.6,
            request_timeout_secs: 240,
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            embedding_model: "bge-large-en".to_string(),
            chunk_size: 512,
            chunk_overlap: 50,
            top_k: default_top_k(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            bind_addr: "127.0.0.1:8000".to_string(),
            grace_period_secs: 10,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            rag: RagConfig::default(),
            service: ServiceConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from `askdoc.yaml` if it exists, otherwise use defaults.
    pub fn load_or_default() -> Self {
        Self::load("askdoc.yaml").unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_defaults() {
        let config = LlmConfig::default();
        assert_eq!(config.model, "llama2:13b-chat");
        assert_eq!(config.base_url, "http://localhost:11434");
        assert_eq!(config.request_timeout_secs, 240);
    }

    #[test]
    fn test_rag_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.embedding_model, "bge-large-en");
        assert_eq!(config.chunk_size, 512);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.top_k, 5);
    }

    #[test]
    fn test_service_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.data_dir, "./data");
        assert_eq!(config.bind_addr, "127.0.0.1:8000");
        assert_eq!(config.grace_period_secs, 10);
    }

    #[test]
    fn test_partial_yaml_falls_back_to_defaults() {
        let yaml = "llm:\n  model: mistral:7b\n  base_url: http://localhost:11434\n  temperature: 0.2\n  request_timeout_secs: 60\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.llm.model, "mistral:7b");
        assert_eq!(config.rag.chunk_size, 512);
        assert_eq!(config.service.grace_period_secs, 10);
    }
}
