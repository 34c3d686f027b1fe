//! Mock provider for testing and offline runs.
//!
//! Embeddings are deterministic bag-of-words vectors, so texts sharing
//! vocabulary land close together under cosine similarity. Generation
//! follows the same contract the prompt template imposes on the real
//! model: answer only from the supplied context, otherwise reply with the
//! fixed unavailability phrase.

use super::types::{GenerateRequest, Provider, ProviderError, Result};
use crate::rag::prompt::UNAVAILABLE_ANSWER;
use async_trait::async_trait;
use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A deterministic stand-in for the Ollama backends.
///
/// Counts its calls so tests can assert that invalid requests never reach
/// the backend.
pub struct MockProvider {
    dimensions: usize,
    canned_answer: Option<String>,
    failing: bool,
    generate_calls: AtomicUsize,
    embed_calls: AtomicUsize,
}

impl MockProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            dimensions: 64,
            canned_answer: None,
            failing: false,
            generate_calls: AtomicUsize::new(0),
            embed_calls: AtomicUsize::new(0),
        }
    }

    /// Always answer with the given string instead of reading the context.
    #[must_use]
    pub fn with_answer(answer: impl Into<String>) -> Self {
        Self {
            canned_answer: Some(answer.into()),
            ..Self::new()
        }
    }

    /// Fail every call, for exercising the server's error boundary.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new()
        }
    }

    pub fn generate_call_count(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn embed_call_count(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn generate(&self, request: GenerateRequest) -> Result<String> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing {
            return Err(ProviderError::Api("mock backend failure".to_string()));
        }

        if let Some(answer) = &self.canned_answer {
            return Ok(answer.clone());
        }

        let question = section(&request.prompt, "Question:", "Context:").unwrap_or_default();
        let context = section(&request.prompt, "Context:", "Answer:").unwrap_or_default();

        Ok(answer_from_context(&question, &context))
    }

    async fn embed(&self, text: &str, _model: &str) -> Result<Vec<f32>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing {
            return Err(ProviderError::Api("mock backend failure".to_string()));
        }

        let mut embedding = vec![0.0f32; self.dimensions];
        for word in words(text) {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            let dim = (hasher.finish() as usize) % self.dimensions;
            embedding[dim] += 1.0;
        }

        // L2 normalize
        let norm_sq: f32 = embedding.iter().map(|v| v * v).sum();
        if norm_sq > 0.0 {
            let inv = 1.0 / norm_sq.sqrt();
            for v in &mut embedding {
                *v *= inv;
            }
        }

        Ok(embedding)
    }
}

/// Extracts the text between two prompt section tags.
fn section(prompt: &str, tag: &str, until: &str) -> Option<String> {
    let start = prompt.find(tag)? + tag.len();
    let rest = &prompt[start..];
    let end = rest.find(until).unwrap_or(rest.len());
    Some(rest[..end].trim().to_string())
}

/// Picks the context passage sharing the most vocabulary with the
/// question, or the unavailability phrase when nothing overlaps enough.
fn answer_from_context(question: &str, context: &str) -> String {
    let question_words: HashSet<String> = words(question).collect();

    let mut best: Option<(usize, &str)> = None;
    for passage in context.split("\n\n") {
        let passage = passage.trim();
        if passage.is_empty() {
            continue;
        }
        let overlap = words(passage)
            .collect::<HashSet<_>>()
            .intersection(&question_words)
            .count();
        if best.map_or(true, |(score, _)| overlap > score) {
            best = Some((overlap, passage));
        }
    }

    match best {
        Some((score, passage)) if score >= 2 => passage.to_string(),
        _ => UNAVAILABLE_ANSWER.to_string(),
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_embed_deterministic() {
        let provider = MockProvider::new();
        let a = provider.embed("hello world", "any").await.unwrap();
        let b = provider.embed("hello world", "any").await.unwrap();
        assert_eq!(a, b, "same input should produce same output");
        assert_eq!(provider.embed_call_count(), 2);
    }

    #[tokio::test]
    async fn test_embed_shared_vocabulary_is_closer() {
        let provider = MockProvider::new();
        let query = provider.embed("what is rust", "any").await.unwrap();
        let related = provider.embed("rust is a language", "any").await.unwrap();
        let unrelated = provider.embed("pelicans fly south", "any").await.unwrap();

        let dot = |a: &[f32], b: &[f32]| -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() };
        assert!(
            dot(&query, &related) > dot(&query, &unrelated),
            "texts sharing words should score higher"
        );
    }

    #[tokio::test]
    async fn test_generate_answers_from_context() {
        let provider = MockProvider::new();
        let prompt = "Question: What is X?\nContext: X is Y (Location: Page 2)\nAnswer:";
        let answer = provider
            .generate(GenerateRequest::new("m", prompt))
            .await
            .unwrap();
        assert!(answer.contains("Y"));
        assert!(answer.contains("Location: Page 2"));
    }

    #[tokio::test]
    async fn test_generate_unavailable_when_context_unrelated() {
        let provider = MockProvider::new();
        let prompt =
            "Question: What color is the sky?\nContext: X is Y (Location: Page 2)\nAnswer:";
        let answer = provider
            .generate(GenerateRequest::new("m", prompt))
            .await
            .unwrap();
        assert_eq!(answer, UNAVAILABLE_ANSWER);
    }

    #[tokio::test]
    async fn test_failing_provider() {
        let provider = MockProvider::failing();
        let err = provider
            .generate(GenerateRequest::new("m", "Question: q\nContext: c\nAnswer:"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Api(_)));
    }
}
