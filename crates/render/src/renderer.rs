//! The render pipeline: resolve, trace, truncate, trace again if anything
//! changed, then serialize.
//!
//! # Determinism
//!
//! Passes run strictly in sequence and each walks the tree in document
//! order, so identical trees always produce identical output even when
//! their deferred values completed in a different order.

use crate::def::FenceMarkers;
use crate::pass::{PromptNodeRender, resolve_prompt_node, serialize_prompt_node, truncate_prompt_node};
use crate::token::HeuristicEstimator;
use crate::trace::trace_prompt_node;
use promptloom_config::RenderConfig;
use promptloom_core::{ErrorAttachment, Node, TokenEstimator, TraceSink};
use std::sync::Arc;
use tracing::info;

/// Settings for a [`PromptRenderer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Model id handed to the token estimator.
    pub model: String,
    /// Where resolution failures are recorded.
    pub error_attachment: ErrorAttachment,
    /// Fence markers for Def blocks.
    pub fences: FenceMarkers,
}

impl RenderOptions {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            model: config.model.clone(),
            error_attachment: config.error_attachment,
            fences: FenceMarkers::from(&config.fences),
        }
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

/// Renders prompt trees. Stateless between calls; create one and reuse it.
pub struct PromptRenderer {
    estimator: Arc<dyn TokenEstimator>,
    options: RenderOptions,
}

impl PromptRenderer {
    pub fn new(estimator: Arc<dyn TokenEstimator>, options: RenderOptions) -> Self {
        Self { estimator, options }
    }

    /// A renderer using [`HeuristicEstimator`] with the configured ratio.
    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(
            Arc::new(HeuristicEstimator::new(config.chars_per_token)),
            RenderOptions::from_config(config),
        )
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render `node` into prompt text and side-channels.
    ///
    /// Node failures never abort the render; they are listed in
    /// [`PromptNodeRender::errors`]. Calling this again on the same tree
    /// reuses resolved values.
    pub async fn render(
        &self,
        node: &mut Node,
        mut trace: Option<&mut dyn TraceSink>,
    ) -> PromptNodeRender {
        let model = self.options.model.as_str();
        let estimator = self.estimator.as_ref();
        let fences = &self.options.fences;

        resolve_prompt_node(node, model, estimator, fences, self.options.error_attachment).await;
        if let Some(trace) = trace.as_deref_mut() {
            trace_prompt_node(trace, node, None).await;
        }

        let truncated = truncate_prompt_node(node, model, estimator).await;
        if truncated && let Some(trace) = trace.as_deref_mut() {
            trace_prompt_node(trace, node, Some("truncated")).await;
        }

        let render = serialize_prompt_node(node, model, estimator, fences, trace).await;
        info!(
            model,
            prompt_chars = render.prompt.len(),
            images = render.images.len(),
            schemas = render.schemas.len(),
            functions = render.functions.len(),
            errors = render.errors.len(),
            truncated,
            "Prompt rendered"
        );
        render
    }
}
