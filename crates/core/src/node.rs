//! The prompt tree: a closed sum type of node variants.
//!
//! Every node carries shared bookkeeping in [`NodeMeta`] and an ordered list
//! of children. Children order is document order: it decides output order
//! in every pass.

use crate::deferred::Deferred;
use crate::error::NodeError;
use crate::file::LinkedFile;
use crate::handler::{FileMergeHandler, FunctionDefinition, FunctionHandler, OutputProcessorHandler};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ── Shared fields ─────────────────────────────────────────────────────────

/// Bookkeeping common to all node variants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeMeta {
    /// Failure captured while resolving or rendering this node.
    pub error: Option<NodeError>,
    /// Estimated token count of the resolved value.
    pub tokens: Option<usize>,
    /// Display priority (shown in traces only).
    pub priority: Option<i32>,
    /// Token budget; exceeding it triggers truncation.
    pub max_tokens: Option<usize>,
}

/// A node in the prompt tree.
#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub meta: NodeMeta,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            meta: NodeMeta::default(),
            children: Vec::new(),
        }
    }

    /// A content-free container, typically the root of a prompt.
    pub fn fragment() -> Self {
        Self::new(NodeKind::Fragment)
    }

    pub fn with_meta(mut self, meta: NodeMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    /// Append a child after the existing ones.
    pub fn push(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Append `child` to `parent`'s children.
pub fn append_child(parent: &mut Node, child: Node) {
    parent.push(child);
}

// ── Variants ──────────────────────────────────────────────────────────────

/// The discriminated payload of a node.
#[derive(Debug)]
pub enum NodeKind {
    Fragment,
    Text(TextNode),
    Def(DefNode),
    Assistant(AssistantNode),
    StringTemplate(StringTemplateNode),
    Image(ImageNode),
    Schema(SchemaNode),
    Function(FunctionNode),
    FileMerge(FileMergeNode),
    OutputProcessor(OutputProcessorNode),
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Fragment => NodeType::Fragment,
            Self::Text(_) => NodeType::Text,
            Self::Def(_) => NodeType::Def,
            Self::Assistant(_) => NodeType::Assistant,
            Self::StringTemplate(_) => NodeType::StringTemplate,
            Self::Image(_) => NodeType::Image,
            Self::Schema(_) => NodeType::Schema,
            Self::Function(_) => NodeType::Function,
            Self::FileMerge(_) => NodeType::FileMerge,
            Self::OutputProcessor(_) => NodeType::OutputProcessor,
        }
    }
}

/// The discriminator tag of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Fragment,
    Text,
    Def,
    Assistant,
    StringTemplate,
    Image,
    Schema,
    Function,
    FileMerge,
    OutputProcessor,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fragment => "fragment",
            Self::Text => "text",
            Self::Def => "def",
            Self::Assistant => "assistant",
            Self::StringTemplate => "stringTemplate",
            Self::Image => "image",
            Self::Schema => "schema",
            Self::Function => "function",
            Self::FileMerge => "fileMerge",
            Self::OutputProcessor => "outputProcessor",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Literal prompt text.
#[derive(Debug)]
pub struct TextNode {
    pub value: Deferred<String>,
    pub resolved: Option<String>,
}

/// Text seeding the assistant response.
#[derive(Debug)]
pub struct AssistantNode {
    pub value: Deferred<String>,
    pub resolved: Option<String>,
}

/// Rendering options for a Def node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefOptions {
    /// Overrides the language inferred from the file extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Prefix each line with its number.
    #[serde(default)]
    pub line_numbers: bool,

    /// Schema name the content conforms to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// A named file embedded as a fenced block.
#[derive(Debug)]
pub struct DefNode {
    pub name: String,
    pub value: Deferred<LinkedFile>,
    pub resolved: Option<LinkedFile>,
    pub options: DefOptions,
}

/// Literal segments interleaved with interpolated values.
///
/// `strings.len() == args.len() + 1` always holds.
#[derive(Debug)]
pub struct StringTemplateNode {
    pub strings: Vec<String>,
    pub args: Vec<Deferred<serde_json::Value>>,
    pub resolved: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    Low,
    High,
}

impl ImageDetail {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::High => "high",
        }
    }
}

/// An image attached to the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<ImageDetail>,
}

impl PromptImage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: None,
            detail: None,
        }
    }
}

impl From<PromptImage> for Deferred<PromptImage> {
    fn from(image: PromptImage) -> Self {
        Self::Ready(image)
    }
}

#[derive(Debug)]
pub struct ImageNode {
    pub value: Deferred<PromptImage>,
    pub resolved: Option<PromptImage>,
}

/// Output format of a rendered schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaFormat {
    #[default]
    TypeScript,
    Json,
    Yaml,
}

impl SchemaFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaOptions {
    #[serde(default)]
    pub format: SchemaFormat,
}

/// A named JSON schema, rendered into the prompt and returned by name.
#[derive(Debug)]
pub struct SchemaNode {
    pub name: String,
    pub value: serde_json::Value,
    pub options: SchemaOptions,
}

pub struct FunctionNode {
    pub definition: FunctionDefinition,
    pub handler: Arc<dyn FunctionHandler>,
}

impl std::fmt::Debug for FunctionNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionNode")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

pub struct FileMergeNode {
    pub handler: Arc<dyn FileMergeHandler>,
}

impl std::fmt::Debug for FileMergeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileMergeNode")
            .field("handler", &self.handler.name())
            .finish()
    }
}

pub struct OutputProcessorNode {
    pub handler: Arc<dyn OutputProcessorHandler>,
}

impl std::fmt::Debug for OutputProcessorNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputProcessorNode")
            .field("handler", &self.handler.name())
            .finish()
    }
}
