//! Resolution pass: join every deferred value and estimate its tokens.
//!
//! A failing node never aborts the pass. Where the failure is recorded is
//! decided by [`ErrorAttachment`]. Nodes that already carry a resolved value
//! or an error are skipped, so a second render reuses the first result.

use crate::def::{FenceMarkers, render_def};
use crate::visitor::{NodeVisitor, visit_node};
use async_trait::async_trait;
use promptloom_core::node::{AssistantNode, DefNode, ImageNode, StringTemplateNode, TextNode};
use promptloom_core::{Deferred, ErrorAttachment, Node, NodeError, NodeMeta, TokenEstimator};
use serde_json::Value;

struct Resolver<'a> {
    model: &'a str,
    estimator: &'a dyn TokenEstimator,
    fences: &'a FenceMarkers,
    attachment: ErrorAttachment,
    root_error: Option<NodeError>,
    resolved: usize,
    failed: usize,
}

impl Resolver<'_> {
    fn fail(&mut self, meta: &mut NodeMeta, kind: &str, error: NodeError) {
        tracing::warn!(node = kind, error = %error, "Node failed to resolve");
        self.failed += 1;
        match self.attachment {
            ErrorAttachment::Leaf => meta.error = Some(error),
            ErrorAttachment::Root => self.root_error = Some(error),
        }
    }

    fn estimate(&self, text: &str) -> usize {
        self.estimator.estimate(self.model, text)
    }

    async fn resolve_text(
        &mut self,
        kind: &str,
        meta: &mut NodeMeta,
        value: &mut Deferred<String>,
        resolved: &mut Option<String>,
    ) {
        if skip(meta, value, resolved) {
            return;
        }
        match value.join().await {
            Ok(text) => {
                meta.tokens = Some(self.estimate(&text));
                tracing::debug!(node = kind, tokens = meta.tokens, "Resolved");
                *resolved = Some(text);
                self.resolved += 1;
            }
            Err(e) => self.fail(meta, kind, e),
        }
    }
}

fn skip<T, U>(meta: &NodeMeta, value: &Deferred<T>, resolved: &Option<U>) -> bool {
    meta.error.is_some() || resolved.is_some() || value.is_taken()
}

/// String form of an interpolated value.
fn arg_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl NodeVisitor for Resolver<'_> {
    async fn text(&mut self, meta: &mut NodeMeta, node: &mut TextNode) {
        self.resolve_text("text", meta, &mut node.value, &mut node.resolved)
            .await;
    }

    async fn assistant(&mut self, meta: &mut NodeMeta, node: &mut AssistantNode) {
        self.resolve_text("assistant", meta, &mut node.value, &mut node.resolved)
            .await;
    }

    async fn def(&mut self, meta: &mut NodeMeta, node: &mut DefNode) {
        if skip(meta, &node.value, &node.resolved) {
            return;
        }
        let file = match node.value.join().await {
            Ok(file) => file,
            Err(e) => return self.fail(meta, "def", e),
        };
        // A Def that cannot be fenced stays unresolved.
        match render_def(&node.name, &file, &node.options, self.fences) {
            Ok(text) => {
                meta.tokens = Some(self.estimate(&text));
                tracing::debug!(node = "def", name = %node.name, tokens = meta.tokens, "Resolved");
                node.resolved = Some(file);
                self.resolved += 1;
            }
            Err(e) => self.fail(meta, "def", e),
        }
    }

    async fn string_template(&mut self, meta: &mut NodeMeta, node: &mut StringTemplateNode) {
        if meta.error.is_some()
            || node.resolved.is_some()
            || node.args.iter().any(Deferred::is_taken)
        {
            return;
        }
        let mut text = String::new();
        for (i, segment) in node.strings.iter().enumerate() {
            text.push_str(segment);
            let Some(arg) = node.args.get_mut(i) else {
                continue;
            };
            match arg.join().await {
                Ok(value) => text.push_str(&arg_to_string(&value)),
                Err(e) => return self.fail(meta, "stringTemplate", e),
            }
        }
        meta.tokens = Some(self.estimate(&text));
        tracing::debug!(node = "stringTemplate", tokens = meta.tokens, "Resolved");
        node.resolved = Some(text);
        self.resolved += 1;
    }

    async fn image(&mut self, meta: &mut NodeMeta, node: &mut ImageNode) {
        if skip(meta, &node.value, &node.resolved) {
            return;
        }
        match node.value.join().await {
            Ok(image) => {
                tracing::debug!(node = "image", url_len = image.url.len(), "Resolved");
                node.resolved = Some(image);
                self.resolved += 1;
            }
            Err(e) => self.fail(meta, "image", e),
        }
    }
}

/// Resolve every content node under `node`, in document order.
pub async fn resolve_prompt_node(
    node: &mut Node,
    model: &str,
    estimator: &dyn TokenEstimator,
    fences: &FenceMarkers,
    attachment: ErrorAttachment,
) {
    let mut resolver = Resolver {
        model,
        estimator,
        fences,
        attachment,
        root_error: None,
        resolved: 0,
        failed: 0,
    };
    visit_node(node, &mut resolver).await;

    if let Some(error) = resolver.root_error.take() {
        node.meta.error = Some(error);
    }
    tracing::debug!(
        resolved = resolver.resolved,
        failed = resolver.failed,
        "Resolution pass complete"
    );
}
