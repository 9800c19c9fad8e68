//! # promptloom core
//!
//! The prompt tree data model, its validated builders, and the collaborator
//! traits the renderer consumes. This crate performs **no I/O**: file
//! loading, token counting and trace output are traits implemented
//! elsewhere.
//!
//! ## Design Philosophy
//!
//! Every collaborator is defined as a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping tokenizers, file loaders and trace sinks per caller
//! - Easy testing with stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod builder;
pub mod deferred;
pub mod error;
pub mod file;
pub mod handler;
pub mod node;
pub mod token;
pub mod trace;
pub mod transform;

// Re-export key types at crate root for ergonomics
pub use builder::{DataFormat, DefDataOptions, NodeOptions};
pub use deferred::Deferred;
pub use error::{BuildError, ErrorAttachment, HandlerError, NodeError};
pub use file::{FileResolver, LinkedFile};
pub use handler::{
    FileMergeHandler, FunctionCallback, FunctionDefinition, FunctionHandler,
    OutputProcessorHandler, OutputProcessorResult,
};
pub use node::{
    DefOptions, ImageDetail, Node, NodeKind, NodeMeta, NodeType, PromptImage, SchemaFormat,
    SchemaOptions, append_child,
};
pub use token::TokenEstimator;
pub use trace::TraceSink;
