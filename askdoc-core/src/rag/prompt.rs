//! Answer-composition prompt template.
//!
//! The template is a behavioral contract: answers come only from the
//! retrieved context, missing answers use the fixed unavailability
//! phrase, replies stay within three sentences, and a location citation
//! is appended when the source makes one derivable.

use super::types::SearchResult;

/// The fixed reply required when the context does not contain the answer.
pub const UNAVAILABLE_ANSWER: &str = "That information is not available to me, \
if you believe it should be in the document please read it to confirm.";

const QA_TEMPLATE: &str = "\
You are an assistant for question-answering tasks.
Based on the document excerpts provided, answer the question succinctly.
If uncertain, state that the answer is unknown.
You must not infer or deduce answers based on external knowledge or assumptions. \
If an answer is not directly observable in the provided excerpts, you are to reply, \
\"That information is not available to me, if you believe it should be in the document \
please read it to confirm.\"
Use up to three sentences for a concise response.
If the answer is in the context given, include the location of your answer from the \
document in the format \"Location: Page <page number>\", \"Location: Section <section number>\", etc.

Question: {question}
Context: {context}
Answer:";

/// Renders the question-answering prompt.
pub(crate) fn render(question: &str, context: &str) -> String {
    QA_TEMPLATE
        .replace("{question}", question)
        .replace("{context}", context)
}

/// Formats retrieved chunks as the context block, one passage per
/// paragraph, labeled with its source document.
pub(crate) fn format_context(results: &[SearchResult]) -> String {
    let mut passages = Vec::with_capacity(results.len());
    for result in results {
        let source = result
            .document
            .metadata
            .get("source")
            .map(String::as_str)
            .unwrap_or("unknown");
        passages.push(format!("[{}] {}", source, result.document.content));
    }
    passages.join("\n\n")
}
