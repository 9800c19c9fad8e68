//! Filesystem-backed file resolver.

use async_trait::async_trait;
use promptloom_core::{FileResolver, LinkedFile, NodeError};
use std::path::{Path, PathBuf};

/// Reads file content with `tokio::fs`, relative to an optional root.
#[derive(Debug, Clone, Default)]
pub struct FsFileResolver {
    root: Option<PathBuf>,
}

impl FsFileResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative filenames against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn path_for(&self, filename: &str) -> PathBuf {
        let path = Path::new(filename);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[async_trait]
impl FileResolver for FsFileResolver {
    async fn resolve(&self, file: LinkedFile) -> Result<LinkedFile, NodeError> {
        if file.content.is_some() {
            return Ok(file);
        }
        let path = self.path_for(&file.filename);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| NodeError::FileRead {
                filename: file.filename.clone(),
                reason: e.to_string(),
            })?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "Loaded file");
        Ok(LinkedFile {
            content: Some(content),
            ..file
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();

        let resolver = FsFileResolver::with_root(dir.path());
        let file = resolver.resolve(LinkedFile::new("a.txt")).await.unwrap();
        assert_eq!(file.filename, "a.txt");
        assert_eq!(file.content.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn existing_content_is_kept() {
        let resolver = FsFileResolver::new();
        let file = resolver
            .resolve(LinkedFile::with_content("missing.txt", "inline"))
            .await
            .unwrap();
        assert_eq!(file.content.as_deref(), Some("inline"));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FsFileResolver::with_root(dir.path());
        let err = resolver.resolve(LinkedFile::new("nope.txt")).await.unwrap_err();
        assert!(matches!(err, NodeError::FileRead { filename, .. } if filename == "nope.txt"));
    }
}
