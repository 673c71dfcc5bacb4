//! Query-time chunk retrieval across the session's indexes.
//!
//! A query targets either every index in the session (`k_all` results per
//! index, concatenated in index order) or the single index of a selected
//! file (`k_selected` results). Indexes that cannot be resolved, loaded, or
//! searched are recorded as [`IndexOutcome::Skipped`] and contribute
//! nothing; retrieval itself never fails.

use crate::config::RetrievalConfig;
use crate::embedding::Embedder;
use crate::index::IndexStore;
use crate::session::Session;

/// Request value meaning "search every file".
pub const ALL_FILES: &str = "All";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    File(String),
}

impl Selection {
    /// `None` and `"All"` select every file.
    pub fn from_request(selected_file: Option<&str>) -> Self {
        match selected_file {
            None => Selection::All,
            Some(name) if name == ALL_FILES => Selection::All,
            Some(name) => Selection::File(name.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndexOutcome {
    Searched { index: String, hits: usize },
    Skipped { index: String, reason: String },
}

/// Retrieved chunk texts plus what happened to each targeted index.
#[derive(Debug, Clone, Default)]
pub struct Retrieval {
    pub chunks: Vec<String>,
    pub outcomes: Vec<IndexOutcome>,
}

impl Retrieval {
    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, IndexOutcome::Skipped { .. }))
            .count()
    }
}

pub struct Retriever<'a> {
    store: &'a IndexStore,
    embedder: &'a dyn Embedder,
    config: &'a RetrievalConfig,
}

impl<'a> Retriever<'a> {
    pub fn new(
        store: &'a IndexStore,
        embedder: &'a dyn Embedder,
        config: &'a RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    pub async fn retrieve(
        &self,
        session: &Session,
        query: &str,
        selection: &Selection,
    ) -> Retrieval {
        let mut retrieval = Retrieval::default();

        let (targets, k) = match selection {
            Selection::All => (session.index_names().to_vec(), self.config.k_all),
            Selection::File(name) => match session.index_for_file(name) {
                Some(index) => (vec![index.to_string()], self.config.k_selected),
                None => {
                    retrieval.outcomes.push(skip(name, "no index for selected file"));
                    return retrieval;
                }
            },
        };

        if targets.is_empty() {
            return retrieval;
        }

        let query_vec = match self.embedder.embed_query(query).await {
            Ok(v) => v,
            Err(e) => {
                let reason = format!("query embedding failed: {:#}", e);
                for index in &targets {
                    retrieval.outcomes.push(skip(index, &reason));
                }
                return retrieval;
            }
        };

        for name in targets {
            match self.store.load(&name).await {
                Ok(index) => {
                    let hits = index.similarity_search(&query_vec, k);
                    retrieval.outcomes.push(IndexOutcome::Searched {
                        index: name,
                        hits: hits.len(),
                    });
                    retrieval.chunks.extend(hits.into_iter().map(|h| h.text));
                }
                Err(e) => {
                    retrieval.outcomes.push(skip(&name, &format!("{:#}", e)));
                }
            }
        }

        retrieval
    }
}

fn skip(index: &str, reason: &str) -> IndexOutcome {
    tracing::warn!(index, reason, "skipping index during retrieval");
    IndexOutcome::Skipped {
        index: index.to_string(),
        reason: reason.to_string(),
    }
}
