//! Token estimator trait: the abstraction over model tokenizers.

/// Estimates how many tokens `text` occupies for `model`.
///
/// Must be deterministic per model; the renderer treats it as a pure
/// function and calls it after every change to a node's resolved value.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, model: &str, text: &str) -> usize;
}

impl<F> TokenEstimator for F
where
    F: Fn(&str, &str) -> usize + Send + Sync,
{
    fn estimate(&self, model: &str, text: &str) -> usize {
        self(model, text)
    }
}
