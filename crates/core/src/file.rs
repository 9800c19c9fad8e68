//! File references embedded by Def nodes and the resolver that loads them.

use crate::deferred::Deferred;
use crate::error::NodeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A file reference, optionally carrying its content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedFile {
    /// Path or display name of the file.
    pub filename: String,

    /// File content; `None` until a [`FileResolver`] loads it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl LinkedFile {
    /// A reference to be loaded later.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: None,
        }
    }

    /// A file whose content is already known.
    pub fn with_content(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: Some(content.into()),
        }
    }
}

impl From<LinkedFile> for Deferred<LinkedFile> {
    fn from(file: LinkedFile) -> Self {
        Self::Ready(file)
    }
}

/// Populates the content of a [`LinkedFile`]. May perform I/O.
#[async_trait]
pub trait FileResolver: Send + Sync {
    async fn resolve(&self, file: LinkedFile) -> Result<LinkedFile, NodeError>;
}
