//! Mirror the prompt tree into a trace sink.

use crate::visitor::{NodeVisitor, visit_node};
use async_trait::async_trait;
use promptloom_core::{Node, NodeKind, TraceSink};

struct TreeTracer<'a> {
    trace: &'a mut dyn TraceSink,
    label: Option<&'a str>,
}

impl TreeTracer<'_> {
    fn title(&self, node: &Node) -> String {
        let mut parts = Vec::with_capacity(3);
        parts.push(match node.kind {
            NodeKind::Fragment => match self.label {
                Some(label) if !label.is_empty() => format!("🌳 prompt tree {label}"),
                _ => "🌳 prompt tree".to_string(),
            },
            _ => node.node_type().to_string(),
        });
        if let Some(priority) = node.meta.priority.filter(|p| *p != 0) {
            parts.push(format!("#{priority}"));
        }
        if let Some(tokens) = node.meta.tokens.filter(|t| *t > 0) {
            parts.push(match node.meta.max_tokens.filter(|m| *m > 0) {
                Some(max) => format!("{tokens}/{max}t"),
                None => format!("{tokens}t"),
            });
        }
        parts.join(", ")
    }
}

#[async_trait]
impl NodeVisitor for TreeTracer<'_> {
    async fn node(&mut self, node: &mut Node) {
        let title = self.title(node);
        if node.has_children() {
            self.trace.start_details(&title);
        } else {
            self.trace.item(&title);
        }
    }

    async fn after_node(&mut self, node: &mut Node) {
        if node.has_children() {
            self.trace.end_details();
        }
    }
}

/// Emit one section or item per node: kind, priority and token usage.
pub async fn trace_prompt_node(trace: &mut dyn TraceSink, node: &mut Node, label: Option<&str>) {
    let mut tracer = TreeTracer { trace, label };
    visit_node(node, &mut tracer).await;
}
