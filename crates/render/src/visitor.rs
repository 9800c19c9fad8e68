//! Order-preserving depth-first traversal of the prompt tree.
//!
//! A visitor overrides only the hooks it needs; every other variant falls
//! through to the default no-op. The walk is sequential: a node, its hook
//! and all of its descendants complete before the next sibling starts.

use async_trait::async_trait;
use futures::future::BoxFuture;
use promptloom_core::node::{
    AssistantNode, DefNode, FileMergeNode, FunctionNode, ImageNode, OutputProcessorNode,
    SchemaNode, StringTemplateNode, TextNode,
};
use promptloom_core::{Node, NodeKind, NodeMeta};

/// Per-variant callbacks invoked by [`visit_node`].
#[async_trait]
pub trait NodeVisitor: Send {
    /// Called before dispatch, for every node.
    async fn node(&mut self, _node: &mut Node) {}

    /// Called after all children have been visited.
    async fn after_node(&mut self, _node: &mut Node) {}

    async fn fragment(&mut self, _meta: &mut NodeMeta) {}

    async fn text(&mut self, _meta: &mut NodeMeta, _node: &mut TextNode) {}

    async fn def(&mut self, _meta: &mut NodeMeta, _node: &mut DefNode) {}

    async fn assistant(&mut self, _meta: &mut NodeMeta, _node: &mut AssistantNode) {}

    async fn string_template(&mut self, _meta: &mut NodeMeta, _node: &mut StringTemplateNode) {}

    async fn image(&mut self, _meta: &mut NodeMeta, _node: &mut ImageNode) {}

    async fn schema(&mut self, _meta: &mut NodeMeta, _node: &mut SchemaNode) {}

    async fn function(&mut self, _meta: &mut NodeMeta, _node: &mut FunctionNode) {}

    async fn file_merge(&mut self, _meta: &mut NodeMeta, _node: &mut FileMergeNode) {}

    async fn output_processor(&mut self, _meta: &mut NodeMeta, _node: &mut OutputProcessorNode) {}
}

/// Walk `node` and its descendants in document order.
pub fn visit_node<'a, V>(node: &'a mut Node, visitor: &'a mut V) -> BoxFuture<'a, ()>
where
    V: NodeVisitor + ?Sized,
{
    Box::pin(async move {
        visitor.node(node).await;

        let Node { kind, meta, .. } = &mut *node;
        match kind {
            NodeKind::Fragment => visitor.fragment(meta).await,
            NodeKind::Text(n) => visitor.text(meta, n).await,
            NodeKind::Def(n) => visitor.def(meta, n).await,
            NodeKind::Assistant(n) => visitor.assistant(meta, n).await,
            NodeKind::StringTemplate(n) => visitor.string_template(meta, n).await,
            NodeKind::Image(n) => visitor.image(meta, n).await,
            NodeKind::Schema(n) => visitor.schema(meta, n).await,
            NodeKind::Function(n) => visitor.function(meta, n).await,
            NodeKind::FileMerge(n) => visitor.file_merge(meta, n).await,
            NodeKind::OutputProcessor(n) => visitor.output_processor(meta, n).await,
        }

        for child in node.children.iter_mut() {
            visit_node(child, &mut *visitor).await;
        }

        visitor.after_node(node).await;
    })
}
