//! The render passes, run strictly in sequence over one tree:
//! resolve, truncate, serialize.

pub mod resolve;
pub mod serialize;
pub mod truncate;

pub use resolve::resolve_prompt_node;
pub use serialize::{PromptNodeRender, serialize_prompt_node};
pub use truncate::truncate_prompt_node;
