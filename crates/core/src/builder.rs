//! Validated node builders.
//!
//! Builders check that required arguments are present and reject option
//! combinations the renderer cannot honour. They never inspect the content of
//! a value, and never await one: deferred values are stored as handles and
//! joined later by the resolver.

use crate::deferred::Deferred;
use crate::error::BuildError;
use crate::file::{FileResolver, LinkedFile};
use crate::handler::{
    FileMergeHandler, FunctionDefinition, FunctionHandler, OutputProcessorHandler,
};
use crate::node::{
    AssistantNode, DefNode, DefOptions, FileMergeNode, FunctionNode, ImageNode, Node, NodeKind,
    NodeMeta, OutputProcessorNode, PromptImage, SchemaNode, SchemaOptions, StringTemplateNode,
    TextNode,
};
use crate::transform::{fence_markdown, records_to_markdown, yaml_stringify};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Options shared by content-bearing nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
}

impl NodeOptions {
    pub fn with_max_tokens(max_tokens: usize) -> Self {
        Self {
            max_tokens: Some(max_tokens),
            ..Self::default()
        }
    }

    fn into_meta(self) -> NodeMeta {
        NodeMeta {
            priority: self.priority,
            max_tokens: self.max_tokens,
            ..NodeMeta::default()
        }
    }
}

fn require_value<T>(node: &'static str, value: &Deferred<T>) -> Result<(), BuildError> {
    if value.is_taken() {
        return Err(BuildError::MissingValue { node });
    }
    Ok(())
}

fn require_field(node: &'static str, field: &'static str, value: &str) -> Result<(), BuildError> {
    if value.is_empty() {
        return Err(BuildError::MissingField { node, field });
    }
    Ok(())
}

// ── Content nodes ─────────────────────────────────────────────────────────

pub fn text_node(
    value: impl Into<Deferred<String>>,
    options: NodeOptions,
) -> Result<Node, BuildError> {
    let value = value.into();
    require_value("text", &value)?;
    Ok(Node::new(NodeKind::Text(TextNode {
        value,
        resolved: None,
    }))
    .with_meta(options.into_meta()))
}

pub fn assistant_node(
    value: impl Into<Deferred<String>>,
    options: NodeOptions,
) -> Result<Node, BuildError> {
    let value = value.into();
    require_value("assistant", &value)?;
    Ok(Node::new(NodeKind::Assistant(AssistantNode {
        value,
        resolved: None,
    }))
    .with_meta(options.into_meta()))
}

/// A named file rendered as a fenced block. An empty name omits the label.
pub fn def_node(
    name: impl Into<String>,
    value: impl Into<Deferred<LinkedFile>>,
    def: DefOptions,
    options: NodeOptions,
) -> Result<Node, BuildError> {
    let value = value.into();
    require_value("def", &value)?;
    Ok(Node::new(NodeKind::Def(DefNode {
        name: name.into(),
        value,
        resolved: None,
        options: def,
    }))
    .with_meta(options.into_meta()))
}

/// Like [`def_node`], loading `file` through `resolver`. Loading starts
/// immediately when a runtime is available.
pub fn def_file_node(
    name: impl Into<String>,
    file: LinkedFile,
    resolver: Arc<dyn FileResolver>,
    def: DefOptions,
    options: NodeOptions,
) -> Result<Node, BuildError> {
    require_field("def", "filename", &file.filename)?;
    let value = Deferred::spawn(async move { resolver.resolve(file).await });
    def_node(name, value, def, options)
}

/// `strings` must hold exactly one more segment than `args`.
pub fn string_template_node(
    strings: Vec<String>,
    args: Vec<Deferred<Value>>,
    options: NodeOptions,
) -> Result<Node, BuildError> {
    if strings.len() != args.len() + 1 {
        return Err(BuildError::TemplateArity {
            expected: args.len() + 1,
            actual: strings.len(),
        });
    }
    if args.iter().any(Deferred::is_taken) {
        return Err(BuildError::MissingValue {
            node: "stringTemplate",
        });
    }
    Ok(Node::new(NodeKind::StringTemplate(StringTemplateNode {
        strings,
        args,
        resolved: None,
    }))
    .with_meta(options.into_meta()))
}

pub fn image_node(
    value: impl Into<Deferred<PromptImage>>,
    options: NodeOptions,
) -> Result<Node, BuildError> {
    let value = value.into();
    require_value("image", &value)?;
    Ok(Node::new(NodeKind::Image(ImageNode {
        value,
        resolved: None,
    }))
    .with_meta(options.into_meta()))
}

// ── Side-channel nodes ────────────────────────────────────────────────────

pub fn schema_node(
    name: impl Into<String>,
    value: Value,
    options: SchemaOptions,
) -> Result<Node, BuildError> {
    let name = name.into();
    require_field("schema", "name", &name)?;
    if value.is_null() {
        return Err(BuildError::MissingValue { node: "schema" });
    }
    Ok(Node::new(NodeKind::Schema(SchemaNode {
        name,
        value,
        options,
    })))
}

pub fn function_node(
    name: impl Into<String>,
    description: impl Into<String>,
    parameters: Value,
    handler: Arc<dyn FunctionHandler>,
) -> Result<Node, BuildError> {
    let name = name.into();
    let description = description.into();
    require_field("function", "name", &name)?;
    require_field("function", "description", &description)?;
    if parameters.is_null() {
        return Err(BuildError::MissingField {
            node: "function",
            field: "parameters",
        });
    }
    Ok(Node::new(NodeKind::Function(FunctionNode {
        definition: FunctionDefinition {
            name,
            description,
            parameters,
        },
        handler,
    })))
}

pub fn file_merge_node(handler: Arc<dyn FileMergeHandler>) -> Node {
    Node::new(NodeKind::FileMerge(FileMergeNode { handler }))
}

pub fn output_processor_node(handler: Arc<dyn OutputProcessorHandler>) -> Node {
    Node::new(NodeKind::OutputProcessor(OutputProcessorNode { handler }))
}

// ── Structured data ───────────────────────────────────────────────────────

/// How [`def_data_node`] serializes its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Csv,
    Json,
    Yaml,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefDataOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<DataFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
}

/// Embed structured data as a text node.
///
/// Arrays become a Markdown table when the format is `csv` (the default when
/// headers are given); `json` and `yaml` produce fenced blocks. Null data
/// yields no node. A token budget is rejected.
pub fn def_data_node(
    name: &str,
    data: &Value,
    options: DefDataOptions,
) -> Result<Option<Node>, BuildError> {
    if data.is_null() {
        return Ok(None);
    }
    if options.max_tokens.is_some() {
        return Err(BuildError::UnsupportedOption {
            node: "defData",
            option: "maxTokens",
        });
    }

    let format = match (options.format, &options.headers, data) {
        (Some(format), _, _) => format,
        (None, Some(_), Value::Array(_)) => DataFormat::Csv,
        (None, _, _) => DataFormat::Yaml,
    };

    let body = match (format, data) {
        (DataFormat::Csv, Value::Array(records)) => {
            records_to_markdown(records, options.headers.as_deref())
        }
        (DataFormat::Json, _) => fence_markdown(&data.to_string(), "json"),
        _ => fence_markdown(&yaml_stringify(data), "yaml"),
    };

    let value = format!("{name}:\n{body}");
    let node = text_node(
        value,
        NodeOptions {
            priority: options.priority,
            max_tokens: None,
        },
    )?;
    Ok(Some(node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HandlerError, NodeError};
    use crate::node::NodeType;
    use async_trait::async_trait;
    use serde_json::json;

    struct Noop;

    #[async_trait]
    impl FunctionHandler for Noop {
        async fn call(&self, _arguments: Value) -> Result<String, HandlerError> {
            Ok(String::new())
        }
    }

    fn text_of(node: &Node) -> Option<&str> {
        match &node.kind {
            NodeKind::Text(TextNode {
                value: Deferred::Ready(v),
                ..
            }) => Some(v.as_str()),
            _ => None,
        }
    }

    #[test]
    fn text_node_carries_options() {
        let node = text_node(
            "hello",
            NodeOptions {
                priority: Some(2),
                max_tokens: Some(10),
            },
        )
        .unwrap();
        assert_eq!(node.node_type(), NodeType::Text);
        assert_eq!(node.meta.priority, Some(2));
        assert_eq!(node.meta.max_tokens, Some(10));
        assert!(node.meta.tokens.is_none());
    }

    #[test]
    fn consumed_value_is_rejected() {
        let err = text_node(Deferred::<String>::Taken, NodeOptions::default()).unwrap_err();
        assert_eq!(err, BuildError::MissingValue { node: "text" });
    }

    #[test]
    fn template_arity_is_checked() {
        let err = string_template_node(
            vec!["a".into()],
            vec![Deferred::ready(json!(1))],
            NodeOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            BuildError::TemplateArity {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn template_accepts_matching_segments() {
        let node = string_template_node(
            vec!["a".into(), "b".into()],
            vec![Deferred::ready(json!("x"))],
            NodeOptions::default(),
        )
        .unwrap();
        assert_eq!(node.node_type(), NodeType::StringTemplate);
    }

    #[test]
    fn schema_requires_name_and_value() {
        assert!(matches!(
            schema_node("", json!({}), SchemaOptions::default()),
            Err(BuildError::MissingField { field: "name", .. })
        ));
        assert!(matches!(
            schema_node("Out", Value::Null, SchemaOptions::default()),
            Err(BuildError::MissingValue { node: "schema" })
        ));
    }

    #[test]
    fn function_requires_description_and_parameters() {
        let missing_description = function_node("lookup", "", json!({}), Arc::new(Noop));
        assert!(matches!(
            missing_description,
            Err(BuildError::MissingField {
                field: "description",
                ..
            })
        ));
        let missing_parameters = function_node("lookup", "Look up", Value::Null, Arc::new(Noop));
        assert!(matches!(
            missing_parameters,
            Err(BuildError::MissingField {
                field: "parameters",
                ..
            })
        ));
    }

    #[test]
    fn def_data_rejects_max_tokens() {
        let err = def_data_node(
            "rows",
            &json!([{"a": 1}]),
            DefDataOptions {
                max_tokens: Some(10),
                ..DefDataOptions::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedOption { .. }));
    }

    #[test]
    fn def_data_skips_null() {
        assert!(
            def_data_node("x", &Value::Null, DefDataOptions::default())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn def_data_defaults_to_yaml() {
        let node = def_data_node("cfg", &json!({"a": 1}), DefDataOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(text_of(&node), Some("cfg:\n```yaml\na: 1\n```"));
    }

    #[test]
    fn def_data_with_headers_renders_table() {
        let node = def_data_node(
            "rows",
            &json!([{"a": 1, "b": 2}]),
            DefDataOptions {
                headers: Some(vec!["a".into(), "b".into()]),
                ..DefDataOptions::default()
            },
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            text_of(&node),
            Some("rows:\n| a | b |\n| --- | --- |\n| 1 | 2 |\n")
        );
    }

    #[test]
    fn def_data_json_is_fenced() {
        let node = def_data_node(
            "obj",
            &json!({"k": "v"}),
            DefDataOptions {
                format: Some(DataFormat::Json),
                ..DefDataOptions::default()
            },
        )
        .unwrap()
        .unwrap();
        assert_eq!(text_of(&node), Some("obj:\n```json\n{\"k\":\"v\"}\n```"));
    }

    #[test]
    fn def_file_node_requires_filename() {
        struct Unused;

        #[async_trait]
        impl FileResolver for Unused {
            async fn resolve(&self, file: LinkedFile) -> Result<LinkedFile, NodeError> {
                Ok(file)
            }
        }

        let err = def_file_node(
            "src",
            LinkedFile::new(""),
            Arc::new(Unused),
            DefOptions::default(),
            NodeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::MissingField { field: "filename", .. }));
    }
}
