//! Stub providers and request helpers shared by the integration tests.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use docsync::config::Config;
use docsync::embedding::Embedder;
use docsync::llm::{ChatModel, Completion, LlmError};
use docsync::pipeline::Services;
use docsync::server::{router, AppState};
use docsync::session::{self, Session, SharedSession};

pub const BOUNDARY: &str = "docsync-test-boundary";

pub const DOCUMENT_SUMMARY: &str = "Version 2 adds a refund clause.";
pub const CODE_SUMMARY: &str = "The second file renames parse to load.";
pub const ANSWER: &str = "Refunds are allowed within 30 days.";

/// Embeds text as counts of a few marker letters. Batches containing
/// `fail_on` are refused.
pub struct LetterEmbedder {
    pub queries: Mutex<Vec<String>>,
    fail_on: Option<&'static str>,
}

impl LetterEmbedder {
    pub fn new() -> Self {
        Self {
            queries: Mutex::new(Vec::new()),
            fail_on: None,
        }
    }

    pub fn failing_on(marker: &'static str) -> Self {
        Self {
            queries: Mutex::new(Vec::new()),
            fail_on: Some(marker),
        }
    }
}

#[async_trait]
impl Embedder for LetterEmbedder {
    fn model_name(&self) -> &str {
        "letters"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if let Some(marker) = self.fail_on {
            if texts.iter().any(|t| t.contains(marker)) {
                anyhow::bail!("embedding service rejected the batch");
            }
        }
        Ok(texts
            .iter()
            .map(|t| {
                ['a', 'e', 'r', 'z']
                    .iter()
                    .map(|ch| t.matches(*ch).count() as f32 + 1.0)
                    .collect()
            })
            .collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.queries.lock().unwrap().push(text.to_string());
        let mut vectors = self.embed(&[text.to_string()]).await?;
        Ok(vectors.remove(0))
    }
}

/// Replies by prompt kind, or fails every call.
pub struct StubModel {
    pub fail: bool,
    pub prompts: Mutex<Vec<String>>,
}

impl StubModel {
    pub fn working() -> Self {
        Self {
            fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for StubModel {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, prompt: &str) -> Result<Completion, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(LlmError::Status {
                status: 503,
                body: "overloaded".to_string(),
            });
        }
        let reply = if prompt.contains("Combined Diff Summary:") {
            CODE_SUMMARY
        } else if prompt.contains("Diff Summary:") {
            DOCUMENT_SUMMARY
        } else {
            ANSWER
        };
        Ok(Completion::new(reply))
    }
}

pub struct TestApp {
    pub app: Router,
    pub embedder: Arc<LetterEmbedder>,
    pub model: Arc<StubModel>,
    pub session: SharedSession,
    pub index_root: TempDir,
}

pub fn test_app(model: StubModel) -> TestApp {
    test_app_with(model, LetterEmbedder::new())
}

pub fn test_app_with(model: StubModel, embedder: LetterEmbedder) -> TestApp {
    let index_root = TempDir::new().unwrap();
    let mut config = Config::default();
    config.index.root = index_root.path().to_path_buf();
    config.retry.max_attempts = 3;
    config.retry.initial_delay_ms = 1;

    let embedder = Arc::new(embedder);
    let model = Arc::new(model);
    let services = Services::new(config, embedder.clone(), model.clone());
    let session = session::shared(Session::empty());
    let state = AppState::new(Arc::new(services), session.clone());

    TestApp {
        app: router(state),
        embedder,
        model,
        session,
        index_root,
    }
}

/// A `POST /process` request carrying `files` as `(name, contents)` parts.
pub fn process_request(files: &[(&str, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, contents) in files {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\n",
                name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(contents);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/process")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn chat_request(question: &str, selected_file: Option<&str>) -> Request<Body> {
    let body = serde_json::json!({
        "question": question,
        "selected_file": selected_file,
    });
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
