//! Truncation pass: shrink resolved values that exceed their token budget.
//!
//! The keep length is `floor(max_tokens * chars / tokens)` characters. This
//! is a linear approximation; the re-estimated count lands close to the
//! budget, not necessarily under it. Def nodes truncate the file content and
//! re-estimate on the content alone.

use crate::visitor::{NodeVisitor, visit_node};
use async_trait::async_trait;
use promptloom_core::node::{AssistantNode, DefNode, StringTemplateNode, TextNode};
use promptloom_core::{Node, NodeMeta, TokenEstimator};

struct Truncator<'a> {
    model: &'a str,
    estimator: &'a dyn TokenEstimator,
    truncated: usize,
}

/// Cut `text` to its first `chars` characters.
fn truncate_chars(text: &mut String, chars: usize) {
    if let Some((at, _)) = text.char_indices().nth(chars) {
        text.truncate(at);
    }
}

/// The character count to keep, when `meta` says the value is over budget.
fn keep_length(meta: &NodeMeta, text: &str) -> Option<usize> {
    if meta.error.is_some() {
        return None;
    }
    let max_tokens = meta.max_tokens?;
    let tokens = meta.tokens.unwrap_or(0);
    if tokens <= max_tokens {
        return None;
    }
    let chars = text.chars().count();
    Some(max_tokens * chars / tokens)
}

impl Truncator<'_> {
    fn cap(&mut self, kind: &str, meta: &mut NodeMeta, resolved: &mut Option<String>) {
        let Some(text) = resolved.as_mut() else {
            return;
        };
        let Some(keep) = keep_length(meta, text) else {
            return;
        };
        let before = meta.tokens;
        truncate_chars(text, keep);
        meta.tokens = Some(self.estimator.estimate(self.model, text));
        self.truncated += 1;
        tracing::debug!(
            node = kind,
            before,
            after = meta.tokens,
            max_tokens = meta.max_tokens,
            "Truncated"
        );
    }
}

#[async_trait]
impl NodeVisitor for Truncator<'_> {
    async fn text(&mut self, meta: &mut NodeMeta, node: &mut TextNode) {
        self.cap("text", meta, &mut node.resolved);
    }

    async fn assistant(&mut self, meta: &mut NodeMeta, node: &mut AssistantNode) {
        self.cap("assistant", meta, &mut node.resolved);
    }

    async fn string_template(&mut self, meta: &mut NodeMeta, node: &mut StringTemplateNode) {
        self.cap("stringTemplate", meta, &mut node.resolved);
    }

    async fn def(&mut self, meta: &mut NodeMeta, node: &mut DefNode) {
        let Some(file) = node.resolved.as_mut() else {
            return;
        };
        self.cap("def", meta, &mut file.content);
    }
}

/// Truncate every over-budget node under `node`. Returns whether any node
/// changed.
pub async fn truncate_prompt_node(
    node: &mut Node,
    model: &str,
    estimator: &dyn TokenEstimator,
) -> bool {
    let mut truncator = Truncator {
        model,
        estimator,
        truncated: 0,
    };
    visit_node(node, &mut truncator).await;
    truncator.truncated > 0
}
