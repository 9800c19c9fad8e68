//! Trace sinks for promptloom.
//!
//! A trace mirrors the prompt tree and how each node resolved. It is
//! write-only: nothing recorded here feeds back into render output.

pub mod log;
pub mod markdown;
pub mod model;

pub use log::TracingSink;
pub use markdown::MarkdownTrace;
pub use model::{TraceEntry, TraceEvent, TraceLog};
