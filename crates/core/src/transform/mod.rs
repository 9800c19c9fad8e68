//! Pure text transforms used when rendering Def, DefData and Schema nodes.

pub mod csv;
pub mod typescript;

pub use csv::{csv_to_markdown, parse_csv, records_to_markdown};
pub use typescript::schema_to_typescript;

/// Serialize a value as YAML. Falls back to JSON if YAML serialization fails.
pub fn yaml_stringify(value: &serde_json::Value) -> String {
    serde_yaml::to_string(value).unwrap_or_else(|_| value.to_string())
}

/// Strip leading and trailing newlines.
pub fn trim_newlines(text: &str) -> &str {
    text.trim_matches(|c| c == '\n' || c == '\r')
}

/// Wrap `text` in a triple-backtick fence tagged with `language`.
pub fn fence_markdown(text: &str, language: &str) -> String {
    format!("```{}\n{}\n```", language, trim_newlines(text))
}
