//! Text chunking for indexing.
//!
//! Documents are split into overlapping chunks before embedding: LLM
//! context is limited, overlap preserves meaning across boundaries, and
//! smaller chunks produce more focused embeddings.

/// Splits text into overlapping chunks.
///
/// Respects UTF-8 character boundaries by sliding to the nearest valid
/// boundary when a chunk edge would split a multi-byte character.
pub(crate) fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return vec![];
    }

    if text.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + chunk_size).min(text.len());

        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }

        let chunk = &text[start..end];
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        if end == text.len() {
            break;
        }

        let step = chunk_size.saturating_sub(overlap).max(1);
        start += step;

        while start < text.len() && !text.is_char_boundary(start) {
            start += 1;
        }
    }

    chunks
}
