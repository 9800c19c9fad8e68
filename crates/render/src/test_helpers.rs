//! Shared test helpers for pass tests.

use async_trait::async_trait;
use promptloom_core::{
    FileMergeHandler, FunctionHandler, HandlerError, OutputProcessorHandler,
    OutputProcessorResult,
};
use std::sync::Mutex;

/// A function handler that records its calls and echoes the arguments.
#[derive(Default)]
pub struct RecordingFunction {
    calls: Mutex<Vec<serde_json::Value>>,
}

impl RecordingFunction {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl FunctionHandler for RecordingFunction {
    async fn call(&self, arguments: serde_json::Value) -> Result<String, HandlerError> {
        let text = arguments.to_string();
        self.calls.lock().unwrap().push(arguments);
        Ok(text)
    }
}

/// A file merge handler that keeps the generated content.
pub struct KeepGenerated(pub &'static str);

#[async_trait]
impl FileMergeHandler for KeepGenerated {
    fn name(&self) -> &str {
        self.0
    }

    async fn merge(
        &self,
        _filename: &str,
        _label: &str,
        _before: Option<&str>,
        generated: Option<&str>,
    ) -> Result<Option<String>, HandlerError> {
        Ok(generated.map(str::to_string))
    }
}

/// An output processor that upper-cases the text.
pub struct Shout(pub &'static str);

#[async_trait]
impl OutputProcessorHandler for Shout {
    fn name(&self) -> &str {
        self.0
    }

    async fn process(&self, text: &str) -> Result<Option<OutputProcessorResult>, HandlerError> {
        Ok(Some(OutputProcessorResult {
            text: Some(text.to_uppercase()),
            ..OutputProcessorResult::default()
        }))
    }
}
