//! Process, chat, and report operations, independent of the transport.
//!
//! Both the HTTP server and the CLI drive the system through these
//! functions. Precondition violations come back as typed errors for the
//! caller to surface; model failures never do.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::answer::Answerer;
use crate::chunk::chunk_with;
use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::extract::extract_upload;
use crate::index::{document_index_name, IndexStore, SINGLE_INDEX_NAME};
use crate::llm::{ChatModel, OpenAiChatModel};
use crate::models::{ComparisonMode, UploadedFile};
use crate::report::{render_report, Summaries, SINGLE_FILE_NOTE};
use crate::retrieve::{Retriever, Selection};
use crate::retry::RetryPolicy;
use crate::session::{Session, SharedSession};
use crate::summarize::{condense, Summarizer};

/// Long-lived collaborators shared by every request.
pub struct Services {
    pub config: Config,
    pub store: IndexStore,
    pub embedder: Arc<dyn Embedder>,
    pub model: Arc<dyn ChatModel>,
}

impl Services {
    pub fn new(config: Config, embedder: Arc<dyn Embedder>, model: Arc<dyn ChatModel>) -> Self {
        let store = IndexStore::new(config.index.root.clone());
        Self {
            config,
            store,
            embedder,
            model,
        }
    }

    /// Services backed by the configured HTTP providers.
    pub fn from_config(config: Config) -> Result<Self> {
        let embedder: Arc<dyn Embedder> =
            Arc::from(create_embedder(&config.model, &config.embedding)?);
        let model: Arc<dyn ChatModel> = Arc::new(OpenAiChatModel::new(&config.model)?);
        Ok(Self::new(config, embedder, model))
    }

    pub fn summarizer(&self) -> Summarizer {
        Summarizer::new(self.model.clone(), RetryPolicy::from_config(&self.config.retry))
    }

    pub fn answerer(&self) -> Answerer {
        Answerer::new(self.model.clone(), self.config.answer.context_chars)
    }

    pub fn retriever(&self) -> Retriever<'_> {
        Retriever::new(&self.store, self.embedder.as_ref(), &self.config.retrieval)
    }
}

/// A file received for processing.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("No files uploaded")]
    NoFiles,
    #[error("Uploaded files could not be processed (unsupported types).")]
    Unsupported,
    #[error("At most 2 supported files can be compared, got {0}")]
    TooManyFiles(usize),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("No files processed. Please /process files first.")]
    NotProcessed,
    #[error("Question is empty")]
    EmptyQuestion,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub processed: bool,
    pub file_names: Vec<String>,
    pub diff_summary: Option<String>,
    pub code_combined_summary: Option<String>,
}

/// Reset the session, extract the uploads, build indexes or summaries
/// according to the comparison mode, and record the new session.
pub async fn process_uploads(
    services: &Services,
    session: &SharedSession,
    uploads: Vec<Upload>,
) -> Result<ProcessOutcome, ProcessError> {
    if uploads.is_empty() {
        return Err(ProcessError::NoFiles);
    }

    let session_id = {
        let mut guard = session.write().await;
        *guard = Session::empty();
        guard.id()
    };

    let files: Vec<UploadedFile> = uploads
        .iter()
        .filter_map(|u| {
            extract_upload(&u.name, &u.bytes).map(|text| UploadedFile::new(&u.name, text))
        })
        .collect();

    if files.is_empty() {
        return Err(ProcessError::Unsupported);
    }
    let mode = ComparisonMode::for_files(&files).ok_or(ProcessError::TooManyFiles(files.len()))?;

    tracing::info!(session = %session_id, files = files.len(), ?mode, "processing uploads");

    let mut index_names = Vec::new();
    let mut summaries = Summaries::default();

    match mode {
        ComparisonMode::Single => {
            build_index(services, SINGLE_INDEX_NAME, &files[0]).await;
            index_names.push(SINGLE_INDEX_NAME.to_string());
        }
        ComparisonMode::Documents => {
            for (position, file) in files.iter().enumerate() {
                let name = document_index_name(position);
                build_index(services, &name, file).await;
                index_names.push(name);
            }
            summaries.document = Some(
                services
                    .summarizer()
                    .document_diff(&files[0].raw_text, &files[1].raw_text)
                    .await,
            );
        }
        ComparisonMode::Code => {
            summaries.code = Some(
                services
                    .summarizer()
                    .code_diff(
                        &files[0].raw_text,
                        &files[1].raw_text,
                        &files[0].name,
                        &files[1].name,
                    )
                    .await,
            );
        }
    }

    let processed = Session::processed(session_id, files, mode, index_names)?;
    let file_names = processed.file_names();
    *session.write().await = processed;

    let budget = services.config.summary.condense_chars;
    let condensed = |s: Option<String>| s.filter(|s| !s.is_empty()).map(|s| condense(&s, budget));

    Ok(ProcessOutcome {
        processed: true,
        file_names,
        diff_summary: condensed(summaries.document),
        code_combined_summary: condensed(summaries.code),
    })
}

/// Build one file's index. A failure is logged and leaves no index behind;
/// retrieval later skips it.
async fn build_index(services: &Services, name: &str, file: &UploadedFile) {
    let chunks = chunk_with(&services.config.chunking, &file.raw_text);
    if let Err(e) = services
        .store
        .build(name, &chunks, services.embedder.as_ref())
        .await
    {
        tracing::warn!(
            index = name,
            file = %file.name,
            error = format!("{:#}", e),
            "index build failed"
        );
    }
}

/// Answer a question about the processed files.
pub async fn answer_question(
    services: &Services,
    session: &Session,
    question: &str,
    selection: &Selection,
) -> Result<String, QueryError> {
    if !session.is_processed() {
        return Err(QueryError::NotProcessed);
    }
    let question = question.trim();
    if question.is_empty() {
        return Err(QueryError::EmptyQuestion);
    }

    let retrieval = services.retriever().retrieve(session, question, selection).await;
    tracing::info!(
        session = %session.id(),
        retrieved = retrieval.chunks.len(),
        skipped = retrieval.skipped(),
        "retrieved context"
    );

    Ok(services
        .answerer()
        .answer(session.files(), &retrieval.chunks, question)
        .await)
}

/// Regenerate the summaries for a processed session. Not cached.
pub async fn summarize_session(services: &Services, session: &Session) -> Summaries {
    let files = session.files();
    match session.mode() {
        Some(ComparisonMode::Code) => Summaries {
            document: None,
            code: Some(
                services
                    .summarizer()
                    .code_diff(
                        &files[0].raw_text,
                        &files[1].raw_text,
                        &files[0].name,
                        &files[1].name,
                    )
                    .await,
            ),
        },
        Some(ComparisonMode::Documents) => Summaries {
            document: Some(
                services
                    .summarizer()
                    .document_diff(&files[0].raw_text, &files[1].raw_text)
                    .await,
            ),
            code: None,
        },
        Some(ComparisonMode::Single) => Summaries {
            document: Some(SINGLE_FILE_NOTE.to_string()),
            code: None,
        },
        None => Summaries::default(),
    }
}

/// Render the report text for the processed session.
pub async fn build_report(services: &Services, session: &Session) -> Result<String, QueryError> {
    if !session.is_processed() {
        return Err(QueryError::NotProcessed);
    }
    let summaries = summarize_session(services, session).await;
    Ok(render_report(&session.file_names(), &summaries, Utc::now()))
}
