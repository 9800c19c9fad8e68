//! In-memory trace sink that renders to Markdown.
//!
//! Sections become `<details>` blocks so the trace stays readable when the
//! prompt tree is deep.

use crate::model::{TraceEvent, TraceLog};
use promptloom_core::TraceSink;

/// Records every trace call and renders the result as Markdown.
#[derive(Debug, Default)]
pub struct MarkdownTrace {
    log: TraceLog,
    depth: usize,
}

impl MarkdownTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded log.
    pub fn log(&self) -> &TraceLog {
        &self.log
    }

    /// Recorded events in order.
    pub fn events(&self) -> Vec<&TraceEvent> {
        self.log.events().collect()
    }

    /// Error messages in order.
    pub fn errors(&self) -> Vec<&str> {
        self.log
            .events()
            .filter_map(|e| match e {
                TraceEvent::Error { message } => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Number of sections still open.
    pub fn open_sections(&self) -> usize {
        self.depth
    }

    /// Serialize the log as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.log)
    }

    /// Render the log as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for event in self.log.events() {
            match event {
                TraceEvent::StartDetails { title } => {
                    out.push_str(&format!("<details>\n<summary>{title}</summary>\n\n"));
                }
                TraceEvent::EndDetails => out.push_str("</details>\n\n"),
                TraceEvent::Item { title } => out.push_str(&format!("- {title}\n")),
                TraceEvent::DetailsFenced {
                    title,
                    content,
                    language,
                } => {
                    out.push_str(&format!(
                        "<details>\n<summary>{title}</summary>\n\n```{language}\n{}\n```\n\n</details>\n\n",
                        content.trim_end_matches('\n')
                    ));
                }
                TraceEvent::Image { url, filename } => {
                    let alt = filename.as_deref().unwrap_or("image");
                    out.push_str(&format!("![{alt}]({url})\n\n"));
                }
                TraceEvent::Error { message } => {
                    out.push_str(&format!("> [!CAUTION]\n> {message}\n\n"));
                }
                TraceEvent::ItemValue { label, value } => {
                    out.push_str(&format!("- {label}: `{value}`\n"));
                }
            }
        }
        out
    }

    fn record(&mut self, event: TraceEvent) {
        self.log.push(self.depth, event);
    }
}

impl TraceSink for MarkdownTrace {
    fn start_details(&mut self, title: &str) {
        self.record(TraceEvent::StartDetails {
            title: title.to_string(),
        });
        self.depth += 1;
    }

    fn end_details(&mut self) {
        // Unbalanced close.
        if self.depth == 0 {
            tracing::debug!("end_details without an open section");
            return;
        }
        self.depth -= 1;
        self.record(TraceEvent::EndDetails);
    }

    fn item(&mut self, title: &str) {
        self.record(TraceEvent::Item {
            title: title.to_string(),
        });
    }

    fn details_fenced(&mut self, title: &str, content: &str, language: &str) {
        self.record(TraceEvent::DetailsFenced {
            title: title.to_string(),
            content: content.to_string(),
            language: language.to_string(),
        });
    }

    fn image(&mut self, url: &str, filename: Option<&str>) {
        self.record(TraceEvent::Image {
            url: url.to_string(),
            filename: filename.map(str::to_string),
        });
    }

    fn error(&mut self, message: &str) {
        self.record(TraceEvent::Error {
            message: message.to_string(),
        });
    }

    fn item_value(&mut self, label: &str, value: &str) {
        self.record(TraceEvent::ItemValue {
            label: label.to_string(),
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_track_depth() {
        let mut trace = MarkdownTrace::new();
        trace.start_details("root");
        trace.item("text");
        assert_eq!(trace.open_sections(), 1);
        trace.end_details();
        assert_eq!(trace.open_sections(), 0);

        let depths: Vec<usize> = trace.log().entries.iter().map(|e| e.depth).collect();
        assert_eq!(depths, vec![0, 1, 0]);
    }

    #[test]
    fn unbalanced_end_is_ignored() {
        let mut trace = MarkdownTrace::new();
        trace.end_details();
        assert!(trace.events().is_empty());
    }

    #[test]
    fn renders_markdown() {
        let mut trace = MarkdownTrace::new();
        trace.start_details("🌳 prompt tree");
        trace.item("text, 3t");
        trace.end_details();
        trace.details_fenced("🧬 schema Out as yaml", "type: string\n", "yaml");
        trace.error("duplicate schema name: Out");

        let md = trace.to_markdown();
        assert!(md.starts_with("<details>\n<summary>🌳 prompt tree</summary>\n\n- text, 3t\n</details>"));
        assert!(md.contains("```yaml\ntype: string\n```"));
        assert!(md.contains("> duplicate schema name: Out"));
    }

    #[test]
    fn collects_errors_in_order() {
        let mut trace = MarkdownTrace::new();
        trace.error("first");
        trace.item("between");
        trace.error("second");
        assert_eq!(trace.errors(), vec!["first", "second"]);
    }

    #[test]
    fn exports_json() {
        let mut trace = MarkdownTrace::new();
        trace.image("https://example.com/a.png", Some("a.png"));
        let json = trace.to_json().unwrap();
        assert!(json.contains("\"kind\": \"image\""));
        assert!(json.contains("a.png"));
    }
}
