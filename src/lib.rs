//! # DocSyncAI
//!
//! A backend for comparing documents and source code with an LLM, then
//! answering questions about the compared files.
//!
//! Uploaded files are reduced to plain text, chunked, and embedded into a
//! small on-disk vector index per file. Two documents get a model-written
//! diff summary; two Python files get a combined code diff summary. Later
//! questions are answered from the indexed chunks and the raw file text.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌──────────────┐
//! │ Uploads  │──▶│  Extract +   │──▶│ Vector index │
//! │ PDF/text │   │ Chunk+Embed │   │  (per file)   │
//! └──────────┘   └──────┬──────┘   └──────┬───────┘
//!                       │                 │
//!                       ▼                 ▼
//!                 ┌───────────┐     ┌───────────┐
//!                 │ Summarize │     │ Retrieve + │
//!                 │  (retry)  │     │  Answer    │
//!                 └───────────┘     └───────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and env overrides |
//! | [`models`] | Core data types |
//! | [`extract`] | Text extraction from uploads |
//! | [`chunk`] | Overlapping text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Per-file vector indexes on disk |
//! | [`retrieve`] | Query-time retrieval across indexes |
//! | [`llm`] | Chat model abstraction |
//! | [`retry`] | Bounded exponential backoff |
//! | [`summarize`] | Diff summaries and condensation |
//! | [`answer`] | Grounded question answering |
//! | [`session`] | The currently processed file set |
//! | [`pipeline`] | Process, chat, and report operations |
//! | [`report`] | Plain-text report rendering |
//! | [`server`] | HTTP API |

pub mod answer;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod index;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod retrieve;
pub mod retry;
pub mod server;
pub mod session;
pub mod summarize;
