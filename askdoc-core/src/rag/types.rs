use std::collections::HashMap;

/// A chunk of source text stored in the index.
///
/// Each document file is split into chunks; every chunk carries its
/// embedding for similarity search plus metadata tracking which file and
/// chunk position it came from.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: HashMap<String, String>,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            embedding,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A search result containing a document chunk and its similarity score.
///
/// Returned by vector search, ordered by descending similarity. Cosine
/// scores range from -1.0 to 1.0; in practice text embeddings land
/// between 0.0 and 1.0.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub document: Document,
    pub score: f32,
}
