//! Trace sink trait: the hierarchical, write-only diagnostic log.
//!
//! The renderer mirrors the prompt tree and its outcomes into a sink. A sink
//! never influences render output and must not fail; implementations
//! swallow their own problems.

/// An ordered, hierarchical log.
pub trait TraceSink: Send {
    /// Open a collapsible section.
    fn start_details(&mut self, title: &str);

    /// Close the innermost open section.
    fn end_details(&mut self);

    /// Emit a leaf line.
    fn item(&mut self, title: &str);

    /// Emit a titled fenced block.
    fn details_fenced(&mut self, title: &str, content: &str, language: &str);

    /// Emit an image reference.
    fn image(&mut self, url: &str, filename: Option<&str>);

    /// Emit an error message.
    fn error(&mut self, message: &str);

    /// Associate a labeled value.
    fn item_value(&mut self, label: &str, value: &str);
}
