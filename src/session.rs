//! The currently processed file set and its derived artifacts.
//!
//! A [`Session`] is replaced wholesale by every `/process` call and read by
//! `/chat` and `/report`. The server keeps it behind a [`SharedSession`].
//!
//! Invariants, enforced by [`Session::processed`]:
//! - a processed session has at least one file;
//! - single-file mode holds one file, code and document modes hold two;
//! - single-file and document modes have one index name per file;
//! - code mode has no index names.

use anyhow::{bail, Result};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{ComparisonMode, UploadedFile};

pub type SharedSession = Arc<RwLock<Session>>;

#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    files: Vec<UploadedFile>,
    index_names: Vec<String>,
    mode: Option<ComparisonMode>,
}

impl Default for Session {
    fn default() -> Self {
        Self::empty()
    }
}

impl Session {
    /// A fresh, unprocessed session.
    pub fn empty() -> Self {
        Self {
            id: Uuid::new_v4(),
            files: Vec::new(),
            index_names: Vec::new(),
            mode: None,
        }
    }

    /// A completed processing cycle.
    pub fn processed(
        id: Uuid,
        files: Vec<UploadedFile>,
        mode: ComparisonMode,
        index_names: Vec<String>,
    ) -> Result<Self> {
        if files.is_empty() {
            bail!("a processed session needs at least one file");
        }
        match mode {
            ComparisonMode::Code if !index_names.is_empty() => {
                bail!("code comparison sessions carry no indexes")
            }
            ComparisonMode::Single if files.len() != 1 => {
                bail!("single-file sessions hold exactly 1 file, got {}", files.len())
            }
            ComparisonMode::Code | ComparisonMode::Documents if files.len() != 2 => {
                bail!("comparison sessions hold exactly 2 files, got {}", files.len())
            }
            ComparisonMode::Single | ComparisonMode::Documents
                if index_names.len() != files.len() =>
            {
                bail!(
                    "{} files but {} index names",
                    files.len(),
                    index_names.len()
                )
            }
            _ => {}
        }

        Ok(Self {
            id,
            files,
            index_names,
            mode: Some(mode),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_processed(&self) -> bool {
        self.mode.is_some()
    }

    pub fn mode(&self) -> Option<ComparisonMode> {
        self.mode
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files.iter().map(|f| f.name.clone()).collect()
    }

    pub fn index_names(&self) -> &[String] {
        &self.index_names
    }

    /// The index built for `file_name`, by position in the parallel lists.
    pub fn index_for_file(&self, file_name: &str) -> Option<&str> {
        let position = self.files.iter().position(|f| f.name == file_name)?;
        self.index_names.get(position).map(String::as_str)
    }
}

pub fn shared(session: Session) -> SharedSession {
    Arc::new(RwLock::new(session))
}
