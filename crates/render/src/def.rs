//! Fenced rendering of Def nodes.
//!
//! A Def block looks like:
//!
//! ````text
//! NAME:
//! ```ts file="src/a.ts" schema=Out
//! ...content...
//! ```
//! ````
//!
//! The markdown fence replaces the default one when the content is markdown
//! or already contains the default fence. CSV and TSV content is rendered as
//! a Markdown table without a fence.

use promptloom_config::FenceConfig;
use promptloom_core::transform::{csv_to_markdown, parse_csv};
use promptloom_core::{DefOptions, LinkedFile, NodeError};
use std::path::Path;

/// The fence pair used for Def blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenceMarkers {
    pub default: String,
    pub markdown: String,
}

impl Default for FenceMarkers {
    fn default() -> Self {
        Self::from(&FenceConfig::default())
    }
}

impl From<&FenceConfig> for FenceMarkers {
    fn from(config: &FenceConfig) -> Self {
        Self {
            default: config.default.clone(),
            markdown: config.markdown.clone(),
        }
    }
}

/// Prefix each line with `[n] `, starting at 1.
pub fn add_line_numbers(text: &str) -> String {
    text.lines()
        .enumerate()
        .map(|(i, line)| format!("[{}] {}", i + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_markdown_file(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    lower.ends_with(".md") || lower.ends_with(".mdx")
}

/// Text after the last dot of the file name; `.env` yields `env`.
fn extension(filename: &str) -> Option<String> {
    let name = Path::new(filename).file_name()?.to_str()?;
    let (_, ext) = name.rsplit_once('.')?;
    (!ext.is_empty()).then(|| ext.to_string())
}

fn table_delimiter(content_type: &str) -> Option<char> {
    match content_type.to_ascii_lowercase().as_str() {
        "csv" => Some(','),
        "tsv" => Some('\t'),
        _ => None,
    }
}

/// Trailing newlines collapse to one; an empty body stays empty.
fn normalize_body(body: &str, line_numbers: bool, fence: &str) -> Result<String, NodeError> {
    let trimmed = body.trim_end_matches(['\n', '\r']);
    let mut out = if !trimmed.is_empty() && line_numbers {
        add_line_numbers(trimmed)
    } else {
        trimmed.to_string()
    };
    if !out.is_empty() {
        out.push('\n');
    }
    if !fence.is_empty() && out.contains(fence) {
        return Err(NodeError::FenceCollision {
            fence: fence.to_string(),
        });
    }
    Ok(out)
}

/// Render a resolved Def node.
pub fn render_def(
    name: &str,
    file: &LinkedFile,
    options: &DefOptions,
    fences: &FenceMarkers,
) -> Result<String, NodeError> {
    let language = options.language.as_deref();
    let fence = match language {
        Some("markdown") | Some("mdx") => fences.markdown.as_str(),
        _ => fences.default.as_str(),
    };
    let content = file.content.as_deref().unwrap_or("");

    let mut block_fence = if is_markdown_file(&file.filename) || content.contains(fence) {
        fences.markdown.as_str()
    } else {
        fence
    };
    let content_type = language
        .map(str::to_string)
        .or_else(|| extension(&file.filename))
        .unwrap_or_default();

    let mut body = content.to_string();
    if let Some(delimiter) = table_delimiter(&content_type)
        && let Some(rows) = parse_csv(content, delimiter)
    {
        body = csv_to_markdown(&rows);
        block_fence = "";
    }
    let body = normalize_body(&body, options.line_numbers, block_fence)?;

    let mut out = String::new();
    if !name.is_empty() {
        out.push_str(name);
        out.push_str(":\n");
    }
    out.push_str(block_fence);
    out.push_str(&content_type);
    if !file.filename.is_empty() {
        out.push_str(&format!(" file=\"{}\"", file.filename));
    }
    if let Some(schema) = &options.schema {
        out.push_str(&format!(" schema={schema}"));
    }
    out.push('\n');
    out.push_str(&body);
    out.push_str(block_fence);
    out.push('\n');
    Ok(out)
}
