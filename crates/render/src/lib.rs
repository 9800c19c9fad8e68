//! Prompt tree rendering: the passes that turn a tree of nodes into prompt
//! text plus side-channels.
//!
//! A render runs four steps over one tree, strictly in sequence:
//!
//! 1. **Resolve** every deferred value and estimate its tokens
//! 2. **Trace** the tree shape and token usage
//! 3. **Truncate** nodes that exceed their token budget (and trace again)
//! 4. **Serialize** into a [`PromptNodeRender`]
//!
//! Failures are captured per node; nothing but a builder error stops the
//! author from getting a result.

pub mod def;
pub mod file;
pub mod pass;
pub mod renderer;
pub mod token;
pub mod trace;
pub mod visitor;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use def::{FenceMarkers, add_line_numbers, render_def};
pub use file::FsFileResolver;
pub use pass::{PromptNodeRender, resolve_prompt_node, serialize_prompt_node, truncate_prompt_node};
pub use renderer::{PromptRenderer, RenderOptions};
pub use token::HeuristicEstimator;
pub use trace::trace_prompt_node;
pub use visitor::{NodeVisitor, visit_node};
