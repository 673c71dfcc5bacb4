//! Diff summaries produced by the chat model.
//!
//! Two specializations share one path: build a prompt, run it through the
//! [`RetryPolicy`], and fall back to [`UNAVAILABLE`] when every attempt
//! fails. The sentinel is a valid summary from the caller's point of view.
//!
//! [`condense`] shortens a summary for API responses without cutting words
//! when a boundary is available.

use std::sync::Arc;

use crate::llm::{ChatModel, LlmError};
use crate::retry::RetryPolicy;

/// Returned in place of a summary when the model stays unreachable.
pub const UNAVAILABLE: &str = "[Commet API unavailable]";

/// Appended when [`condense`] has to cut inside a word.
pub const ELLIPSIS: &str = "...";

pub struct Summarizer {
    model: Arc<dyn ChatModel>,
    policy: RetryPolicy,
}

impl Summarizer {
    pub fn new(model: Arc<dyn ChatModel>, policy: RetryPolicy) -> Self {
        Self { model, policy }
    }

    /// Key differences, additions, and removals between two documents.
    pub async fn document_diff(&self, version1: &str, version2: &str) -> String {
        let prompt = document_diff_prompt(version1, version2);
        self.invoke("document_diff", &prompt).await
    }

    /// One-paragraph review of the changes between two code files.
    pub async fn code_diff(&self, code1: &str, code2: &str, file1: &str, file2: &str) -> String {
        let prompt = code_diff_prompt(code1, code2, file1, file2);
        self.invoke("code_diff", &prompt).await
    }

    async fn invoke(&self, label: &str, prompt: &str) -> String {
        let model = self.model.clone();
        let completion = self
            .policy
            .run_if(label, LlmError::is_retryable, || {
                let model = model.clone();
                async move { model.complete(prompt).await }
            })
            .await;

        match completion {
            Some(c) => c.text,
            None => UNAVAILABLE.to_string(),
        }
    }
}

pub fn document_diff_prompt(version1: &str, version2: &str) -> String {
    format!(
        "Compare the two versions of the document below. Summarize the key differences, \
         additions, and removals. Be concise and accurate.\n\n\
         Version 1:\n{version1}\n\n\
         Version 2:\n{version2}\n\n\
         Diff Summary:\n"
    )
}

pub fn code_diff_prompt(code1: &str, code2: &str, file1: &str, file2: &str) -> String {
    format!(
        "You are reviewing code. Compare the two files ({file1} and {file2}) and describe the \
         main differences, version changes, improvements, and their impact in context, as a \
         single concise paragraph.\n\n\
         Code File 1 ({file1}):\n{code1}\n\n\
         Code File 2 ({file2}):\n{code2}\n\n\
         Combined Diff Summary:\n"
    )
}

/// Collapse whitespace and trim to at most `max_chars` characters.
///
/// Cuts after the last `". "` inside the budget, else at the last space,
/// else hard-cuts and appends [`ELLIPSIS`].
pub fn condense(text: &str, max_chars: usize) -> String {
    let clean = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let cut = match clean.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => byte_idx,
        None => return clean,
    };
    let window = &clean[..cut];

    if let Some(end) = window.rfind(". ") {
        return clean[..=end].trim().to_string();
    }
    if let Some(end) = window.rfind(' ') {
        return clean[..end].trim().to_string();
    }

    format!("{}{}", window.trim_end(), ELLIPSIS)
}
