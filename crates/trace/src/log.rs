//! Trace sink that forwards to `tracing` events.

use promptloom_core::TraceSink;

/// Emits each trace call as a `tracing` event under the `promptloom::trace`
/// target, carrying the current section path.
#[derive(Debug, Default)]
pub struct TracingSink {
    sections: Vec<String>,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn path(&self) -> String {
        self.sections.join(" / ")
    }
}

impl TraceSink for TracingSink {
    fn start_details(&mut self, title: &str) {
        self.sections.push(title.to_string());
        tracing::debug!(target: "promptloom::trace", section = %self.path(), "start");
    }

    fn end_details(&mut self) {
        if let Some(title) = self.sections.pop() {
            tracing::debug!(target: "promptloom::trace", section = %title, "end");
        }
    }

    fn item(&mut self, title: &str) {
        tracing::debug!(target: "promptloom::trace", section = %self.path(), "{title}");
    }

    fn details_fenced(&mut self, title: &str, content: &str, language: &str) {
        tracing::debug!(
            target: "promptloom::trace",
            section = %self.path(),
            language,
            content,
            "{title}"
        );
    }

    fn image(&mut self, url: &str, filename: Option<&str>) {
        tracing::debug!(target: "promptloom::trace", section = %self.path(), url, filename, "image");
    }

    fn error(&mut self, message: &str) {
        tracing::warn!(target: "promptloom::trace", section = %self.path(), "{message}");
    }

    fn item_value(&mut self, label: &str, value: &str) {
        tracing::debug!(target: "promptloom::trace", section = %self.path(), value, "{label}");
    }
}
