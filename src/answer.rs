//! Free-form question answering grounded in the processed files.
//!
//! The context handed to the model lists the processed file names, then
//! either the leading characters of each raw file (when raw texts are
//! available) or, failing that, the retrieved chunks. The model is told to
//! reply with [`REFUSAL_PHRASE`] when the context has no answer; such
//! replies, and empty ones, become [`FALLBACK_ANSWER`].
//!
//! The model is called once, without retries. A failed call is treated as
//! an empty answer.

use std::sync::Arc;

use crate::llm::ChatModel;
use crate::models::UploadedFile;

pub const REFUSAL_PHRASE: &str = "answer is not available in the context";

pub const FALLBACK_ANSWER: &str = "I cannot answer that from the processed files. \
     Please provide more context or upload relevant files.";

/// Build the context block for a question.
pub fn assemble_context(
    files: &[UploadedFile],
    retrieved: &[String],
    prefix_chars: usize,
) -> String {
    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    let header = format!("Files processed: {}\n", names.join(", "));

    let contents = if files.is_empty() {
        retrieved.join("\n")
    } else {
        files
            .iter()
            .map(|f| {
                let prefix: String = f.raw_text.chars().take(prefix_chars).collect();
                format!("{}:\n{}", f.name, prefix)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    format!("{}\nContext:\n{}", header, contents)
}

pub fn answer_prompt(context: &str, question: &str) -> String {
    format!(
        "Answer the question as thoroughly as possible using only the provided context, \
         including every relevant detail. If the answer is not in the provided context, reply \
         exactly \"{REFUSAL_PHRASE}\". Do not guess.\n\n\
         Context:\n{context}\n\n\
         Question:\n{question}\n\n\
         Answer:\n"
    )
}

/// Replace empty or refusing answers with [`FALLBACK_ANSWER`].
pub fn finalize_answer(raw: &str) -> String {
    if raw.trim().is_empty() || raw.to_lowercase().contains(REFUSAL_PHRASE) {
        FALLBACK_ANSWER.to_string()
    } else {
        raw.to_string()
    }
}

pub struct Answerer {
    model: Arc<dyn ChatModel>,
    prefix_chars: usize,
}

impl Answerer {
    pub fn new(model: Arc<dyn ChatModel>, prefix_chars: usize) -> Self {
        Self {
            model,
            prefix_chars,
        }
    }

    pub async fn answer(
        &self,
        files: &[UploadedFile],
        retrieved: &[String],
        question: &str,
    ) -> String {
        let context = assemble_context(files, retrieved, self.prefix_chars);
        let prompt = answer_prompt(&context, question);

        let raw = match self.model.complete(&prompt).await {
            Ok(completion) => completion.text,
            Err(e) => {
                tracing::warn!(error = %e, "chat model call failed");
                String::new()
            }
        };

        finalize_answer(&raw)
    }
}
