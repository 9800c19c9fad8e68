//! Callback traits carried by Function, FileMerge and OutputProcessor nodes.
//!
//! These nodes contribute nothing to prompt text; the renderer collects their
//! handlers into side-channels so the caller can invoke them after the model
//! responds.

use crate::error::HandlerError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A callable function description sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// The function name
    pub name: String,

    /// Description of what the function does
    pub description: String,

    /// JSON Schema describing the function's parameters
    pub parameters: serde_json::Value,
}

/// A function the model may call.
#[async_trait]
pub trait FunctionHandler: Send + Sync {
    /// Invoke the function with JSON arguments produced by the model.
    async fn call(&self, arguments: serde_json::Value) -> Result<String, HandlerError>;
}

/// A function descriptor paired with the handler it was registered with.
#[derive(Clone)]
pub struct FunctionCallback {
    pub definition: FunctionDefinition,
    pub handler: Arc<dyn FunctionHandler>,
}

impl std::fmt::Debug for FunctionCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionCallback")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

/// Merges generated content for a file into its previous content.
#[async_trait]
pub trait FileMergeHandler: Send + Sync {
    /// Label shown in traces.
    fn name(&self) -> &str;

    /// Return the merged content, or `None` to leave the file untouched.
    async fn merge(
        &self,
        filename: &str,
        label: &str,
        before: Option<&str>,
        generated: Option<&str>,
    ) -> Result<Option<String>, HandlerError>;
}

/// The outcome of an output processor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputProcessorResult {
    /// Replacement text, if the processor rewrote the output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Files to write, keyed by filename.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub files: HashMap<String, String>,
}

/// Post-processes the model's output text.
#[async_trait]
pub trait OutputProcessorHandler: Send + Sync {
    /// Label shown in traces.
    fn name(&self) -> &str;

    /// Process `text`; `None` means nothing changed.
    async fn process(&self, text: &str) -> Result<Option<OutputProcessorResult>, HandlerError>;
}
