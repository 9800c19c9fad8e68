//! Error types for prompt construction and rendering.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Builder failures are fatal to the authoring call; node failures are
//! captured on the node and surfaced in the render result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a resolution failure is recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorAttachment {
    /// On the node whose value failed; only that node is excluded from output.
    #[default]
    Leaf,
    /// On the node the resolve call started from, as a coarse subtree signal.
    Root,
}

/// A construction-time validation failure raised by a node builder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("{node} node requires a value")]
    MissingValue { node: &'static str },

    #[error("{node} node requires a non-empty {field}")]
    MissingField {
        node: &'static str,
        field: &'static str,
    },

    #[error("{option} not supported for {node}")]
    UnsupportedOption {
        node: &'static str,
        option: &'static str,
    },

    #[error("string template expects {expected} literal segments, got {actual}")]
    TemplateArity { expected: usize, actual: usize },
}

/// A failure captured while resolving or rendering a single node.
///
/// `Clone` so the error can stay attached to the node (for tracing) and
/// also be reported in the render result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    #[error("value rejected: {0}")]
    Rejected(String),

    #[error("source contains fence {fence}")]
    FenceCollision { fence: String },

    #[error("failed to read {filename}: {reason}")]
    FileRead { filename: String, reason: String },

    #[error("deferred value task failed: {0}")]
    Join(String),

    #[error("deferred value already joined")]
    AlreadyJoined,

    #[error("render failed: {0}")]
    Render(String),
}

impl NodeError {
    /// Shorthand for a rejected pending value.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

/// An error returned by a function, file-merge or output-processor handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{name} failed: {reason}")]
    ExecutionFailed { name: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
