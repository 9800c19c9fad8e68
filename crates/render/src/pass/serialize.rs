//! Serialization pass: flatten the resolved tree into prompt text and
//! side-channels.

use crate::def::{FenceMarkers, render_def};
use crate::visitor::{NodeVisitor, visit_node};
use async_trait::async_trait;
use promptloom_core::node::{
    AssistantNode, DefNode, FileMergeNode, FunctionNode, ImageNode, OutputProcessorNode,
    SchemaNode, StringTemplateNode, TextNode,
};
use promptloom_core::transform::{schema_to_typescript, trim_newlines, yaml_stringify};
use promptloom_core::{
    FileMergeHandler, FunctionCallback, Node, NodeError, NodeMeta, OutputProcessorHandler,
    PromptImage, SchemaFormat, TokenEstimator, TraceSink,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Everything a render produces.
#[derive(Default)]
pub struct PromptNodeRender {
    /// User prompt text.
    pub prompt: String,
    /// Text seeding the assistant response.
    pub assistant_prompt: String,
    /// Images in document order.
    pub images: Vec<PromptImage>,
    /// Node errors in encounter order.
    pub errors: Vec<NodeError>,
    /// Schemas by name; a later duplicate replaces an earlier one.
    pub schemas: HashMap<String, Value>,
    pub functions: Vec<FunctionCallback>,
    pub file_merges: Vec<Arc<dyn FileMergeHandler>>,
    pub output_processors: Vec<Arc<dyn OutputProcessorHandler>>,
}

impl PromptNodeRender {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl std::fmt::Debug for PromptNodeRender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptNodeRender")
            .field("prompt", &self.prompt)
            .field("assistant_prompt", &self.assistant_prompt)
            .field("images", &self.images)
            .field("errors", &self.errors)
            .field("schemas", &self.schemas)
            .field("functions", &self.functions)
            .field("file_merges", &self.file_merges.len())
            .field("output_processors", &self.output_processors.len())
            .finish()
    }
}

struct Serializer<'a, 't> {
    model: &'a str,
    estimator: &'a dyn TokenEstimator,
    fences: &'a FenceMarkers,
    trace: Option<&'t mut dyn TraceSink>,
    out: PromptNodeRender,
}

impl Serializer<'_, '_> {
    fn push_line(buffer: &mut String, meta: &NodeMeta, resolved: Option<&str>) {
        if meta.error.is_some() {
            return;
        }
        if let Some(value) = resolved {
            buffer.push_str(value);
            buffer.push('\n');
        }
    }
}

/// The image title shown in traces.
fn image_title(image: &PromptImage) -> String {
    let detail = image.detail.map(|d| d.as_str()).unwrap_or_default();
    let label = match &image.filename {
        Some(filename) => filename.clone(),
        None => format!("{}...", image.url.chars().take(64).collect::<String>()),
    };
    format!("📷 image: {detail} {label}")
}

/// Render a schema in `format`.
fn schema_text(name: &str, schema: &Value, format: SchemaFormat) -> String {
    match format {
        SchemaFormat::Json => {
            serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string())
        }
        SchemaFormat::Yaml => yaml_stringify(schema),
        SchemaFormat::TypeScript => schema_to_typescript(schema, name),
    }
}

#[async_trait]
impl NodeVisitor for Serializer<'_, '_> {
    async fn node(&mut self, node: &mut Node) {
        if let Some(error) = &node.meta.error {
            self.out.errors.push(error.clone());
        }
    }

    async fn text(&mut self, meta: &mut NodeMeta, node: &mut TextNode) {
        Self::push_line(&mut self.out.prompt, meta, node.resolved.as_deref());
    }

    async fn assistant(&mut self, meta: &mut NodeMeta, node: &mut AssistantNode) {
        Self::push_line(&mut self.out.assistant_prompt, meta, node.resolved.as_deref());
    }

    async fn string_template(&mut self, meta: &mut NodeMeta, node: &mut StringTemplateNode) {
        Self::push_line(&mut self.out.prompt, meta, node.resolved.as_deref());
    }

    async fn def(&mut self, meta: &mut NodeMeta, node: &mut DefNode) {
        if meta.error.is_some() {
            return;
        }
        let Some(file) = &node.resolved else {
            return;
        };
        match render_def(&node.name, file, &node.options, self.fences) {
            Ok(text) => {
                self.out.prompt.push_str(&text);
                self.out.prompt.push('\n');
            }
            Err(e) => {
                tracing::warn!(name = %node.name, error = %e, "Def failed to render");
                self.out.errors.push(e.clone());
                meta.error = Some(e);
            }
        }
    }

    async fn image(&mut self, meta: &mut NodeMeta, node: &mut ImageNode) {
        if meta.error.is_some() {
            return;
        }
        let Some(image) = node.resolved.as_ref().filter(|i| !i.url.is_empty()) else {
            return;
        };
        self.out.images.push(image.clone());
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.start_details(&image_title(image));
            trace.image(&image.url, image.filename.as_deref());
            trace.end_details();
        }
    }

    async fn schema(&mut self, meta: &mut NodeMeta, node: &mut SchemaNode) {
        let name = node.name.as_str();
        if self.out.schemas.contains_key(name) {
            tracing::warn!(name, "Duplicate schema name");
            if let Some(trace) = self.trace.as_deref_mut() {
                trace.error(&format!("duplicate schema name: {name}"));
            }
        }
        self.out.schemas.insert(name.to_string(), node.value.clone());

        let format = node.options.format;
        let schema = schema_text(name, &node.value, format);
        let text = format!(
            "{name}:\n```{}-schema\n{}\n```\n",
            format.as_str(),
            trim_newlines(&schema)
        );
        meta.tokens = Some(self.estimator.estimate(self.model, &text));
        self.out.prompt.push_str(&text);

        if format != SchemaFormat::Json
            && let Some(trace) = self.trace.as_deref_mut()
        {
            trace.details_fenced(
                &format!("🧬 schema {name} as {}", format.as_str()),
                &schema,
                format.as_str(),
            );
        }
    }

    async fn function(&mut self, _meta: &mut NodeMeta, node: &mut FunctionNode) {
        let definition = node.definition.clone();
        if let Some(trace) = self.trace.as_deref_mut() {
            let details = serde_json::json!({
                "description": &definition.description,
                "parameters": &definition.parameters,
            });
            trace.details_fenced(
                &format!("🛠️ function {}", definition.name),
                &yaml_stringify(&details),
                "yaml",
            );
        }
        self.out.functions.push(FunctionCallback {
            definition,
            handler: Arc::clone(&node.handler),
        });
    }

    async fn file_merge(&mut self, _meta: &mut NodeMeta, node: &mut FileMergeNode) {
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.item_value("file merge", node.handler.name());
        }
        self.out.file_merges.push(Arc::clone(&node.handler));
    }

    async fn output_processor(&mut self, _meta: &mut NodeMeta, node: &mut OutputProcessorNode) {
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.item_value("output processor", node.handler.name());
        }
        self.out.output_processors.push(Arc::clone(&node.handler));
    }
}

/// Flatten `node` into a [`PromptNodeRender`]. The schema map is local to
/// this call.
pub async fn serialize_prompt_node(
    node: &mut Node,
    model: &str,
    estimator: &dyn TokenEstimator,
    fences: &FenceMarkers,
    trace: Option<&mut dyn TraceSink>,
) -> PromptNodeRender {
    let mut serializer = Serializer {
        model,
        estimator,
        fences,
        trace,
        out: PromptNodeRender::default(),
    };
    visit_node(node, &mut serializer).await;
    serializer.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass::resolve_prompt_node;
    use crate::token::HeuristicEstimator;
    use crate::test_helpers::{KeepGenerated, RecordingFunction, Shout};
    use promptloom_core::builder::{
        assistant_node, def_node, file_merge_node, function_node, image_node,
        output_processor_node, schema_node, text_node,
    };
    use promptloom_core::node::SchemaOptions;
    use promptloom_core::{Deferred, DefOptions, ErrorAttachment, LinkedFile, NodeOptions};
    use promptloom_trace::MarkdownTrace;
    use serde_json::json;

    const MODEL: &str = "gpt-4o";

    async fn render(root: &mut Node, trace: Option<&mut dyn TraceSink>) -> PromptNodeRender {
        let estimator = HeuristicEstimator::default();
        let fences = FenceMarkers::default();
        resolve_prompt_node(root, MODEL, &estimator, &fences, ErrorAttachment::Leaf).await;
        serialize_prompt_node(root, MODEL, &estimator, &fences, trace).await
    }

    #[tokio::test]
    async fn text_and_assistant_go_to_separate_buffers() {
        let mut root = Node::fragment().with_children(vec![
            text_node("A", NodeOptions::default()).unwrap(),
            assistant_node("seed", NodeOptions::default()).unwrap(),
            text_node("B", NodeOptions::default()).unwrap(),
        ]);
        let out = render(&mut root, None).await;
        assert_eq!(out.prompt, "A\nB\n");
        assert_eq!(out.assistant_prompt, "seed\n");
        assert!(!out.has_errors());
    }

    #[tokio::test]
    async fn errored_nodes_are_reported_not_rendered() {
        let mut root = Node::fragment().with_children(vec![
            text_node(
                Deferred::<String>::spawn(async { Err(NodeError::rejected("nope")) }),
                NodeOptions::default(),
            )
            .unwrap(),
            text_node("kept", NodeOptions::default()).unwrap(),
        ]);
        let out = render(&mut root, None).await;
        assert_eq!(out.prompt, "kept\n");
        assert_eq!(out.errors, vec![NodeError::rejected("nope")]);
    }

    #[tokio::test]
    async fn def_block_is_followed_by_newline() {
        let mut root = def_node(
            "CODE",
            LinkedFile::with_content("a.js", "x()"),
            DefOptions::default(),
            NodeOptions::default(),
        )
        .unwrap();
        let out = render(&mut root, None).await;
        assert_eq!(out.prompt, "CODE:\n```js file=\"a.js\"\nx()\n```\n\n");
    }

    #[tokio::test]
    async fn schema_renders_in_requested_format() {
        let mut root = schema_node(
            "Out",
            json!({"type": "object", "properties": {"a": {"type": "string"}}, "required": ["a"]}),
            SchemaOptions {
                format: SchemaFormat::Json,
            },
        )
        .unwrap();
        let out = render(&mut root, None).await;
        assert!(out.prompt.starts_with("Out:\n```json-schema\n{\n"));
        assert!(out.prompt.ends_with("}\n```\n"));
        assert_eq!(out.schemas["Out"]["type"], "object");
        assert!(root.meta.tokens.unwrap() > 0);
    }

    #[tokio::test]
    async fn typescript_and_yaml_schemas_are_fenced_and_traced() {
        let mut root = Node::fragment().with_children(vec![
            schema_node(
                "Name",
                json!({"type": "string"}),
                SchemaOptions {
                    format: SchemaFormat::TypeScript,
                },
            )
            .unwrap(),
            schema_node(
                "Count",
                json!({"type": "integer"}),
                SchemaOptions {
                    format: SchemaFormat::Yaml,
                },
            )
            .unwrap(),
        ]);
        let mut trace = MarkdownTrace::new();
        let out = render(&mut root, Some(&mut trace)).await;

        assert_eq!(
            out.prompt,
            "Name:\n```typescript-schema\ntype Name = string\n```\n\
             Count:\n```yaml-schema\ntype: integer\n```\n"
        );
        assert_eq!(trace.log().count("details_fenced"), 2);
        let md = trace.to_markdown();
        assert!(md.contains("🧬 schema Name as typescript"));
        assert!(md.contains("🧬 schema Count as yaml"));
    }

    #[tokio::test]
    async fn json_schema_is_not_traced() {
        let mut root =
            schema_node("Out", json!({"type": "string"}), SchemaOptions { format: SchemaFormat::Json })
                .unwrap();
        let mut trace = MarkdownTrace::new();
        render(&mut root, Some(&mut trace)).await;
        assert_eq!(trace.log().count("details_fenced"), 0);
    }

    #[tokio::test]
    async fn images_are_collected_and_traced() {
        let mut root = Node::fragment().with_children(vec![
            image_node(
                PromptImage {
                    url: "https://example.com/cat.png".into(),
                    filename: Some("cat.png".into()),
                    detail: None,
                },
                NodeOptions::default(),
            )
            .unwrap(),
            image_node(PromptImage::new(""), NodeOptions::default()).unwrap(),
        ]);
        let mut trace = MarkdownTrace::new();
        let out = render(&mut root, Some(&mut trace)).await;

        assert_eq!(out.images.len(), 1);
        assert_eq!(out.images[0].filename.as_deref(), Some("cat.png"));
        assert_eq!(trace.log().count("image"), 1);
        assert_eq!(trace.open_sections(), 0);
    }

    #[tokio::test]
    async fn handlers_go_to_side_channels() {
        let function = Arc::new(RecordingFunction::default());
        let mut root = Node::fragment().with_children(vec![
            function_node(
                "lookup",
                "Look something up",
                json!({"type": "object"}),
                function.clone(),
            )
            .unwrap(),
            file_merge_node(Arc::new(KeepGenerated("keep"))),
            output_processor_node(Arc::new(Shout("shout"))),
        ]);
        let mut trace = MarkdownTrace::new();
        let out = render(&mut root, Some(&mut trace)).await;

        assert!(out.prompt.is_empty());
        assert_eq!(out.functions.len(), 1);
        assert_eq!(out.functions[0].definition.name, "lookup");
        assert_eq!(out.file_merges[0].name(), "keep");
        assert_eq!(out.output_processors[0].name(), "shout");

        let reply = out.functions[0].handler.call(json!({"q": 1})).await.unwrap();
        assert_eq!(reply, r#"{"q":1}"#);
        assert_eq!(function.call_count(), 1);

        let md = trace.to_markdown();
        assert!(md.contains("🛠️ function lookup"));
        assert!(md.contains("- file merge: `keep`"));
        assert!(md.contains("- output processor: `shout`"));
    }

    #[tokio::test]
    async fn duplicate_schema_is_flagged_and_replaced() {
        let mut root = Node::fragment().with_children(vec![
            schema_node("Out", json!({"type": "string"}), SchemaOptions::default()).unwrap(),
            schema_node("Out", json!({"type": "number"}), SchemaOptions::default()).unwrap(),
        ]);
        let mut trace = MarkdownTrace::new();
        let out = render(&mut root, Some(&mut trace)).await;

        assert_eq!(out.schemas.len(), 1);
        assert_eq!(out.schemas["Out"], json!({"type": "number"}));
        assert_eq!(trace.errors(), vec!["duplicate schema name: Out"]);
        assert!(out.errors.is_empty());
    }

    #[test]
    fn long_image_urls_are_shortened_in_titles() {
        let image = PromptImage::new(format!("data:image/png;base64,{}", "A".repeat(200)));
        let title = image_title(&image);
        assert!(title.ends_with("..."));
        assert!(title.chars().count() < 90);
    }
}
