//! File-backed parameter store
//!
//! Parameter paths such as `/joinquant/dev/fred/series1` resolve to files
//! below a root directory, so deployments can drop the same documents the
//! hosted parameter store would serve.

use crate::clients::ConfigSource;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Parameter store rooted at a local directory
pub struct FileParameterStore {
    root: PathBuf,
}

impl FileParameterStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a parameter path to a file, refusing anything that escapes the root
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));

        if relative.as_os_str().is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(AppError::ConfigUnavailable(format!(
                "Invalid parameter path: {}",
                path
            )));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ConfigSource for FileParameterStore {
    async fn get(&self, path: &str) -> Result<String> {
        let file = self.resolve(path)?;

        let value = tokio::fs::read_to_string(&file).await.map_err(|e| {
            AppError::ConfigUnavailable(format!("Failed to read parameter {}: {}", path, e))
        })?;

        tracing::debug!("Read parameter {} from {:?}", path, file);
        Ok(value.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_reads_parameter_file() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("joinquant/dev/fred");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("apikey"), "abc123\n").unwrap();

        let store = FileParameterStore::new(dir.path());
        assert_eq!(store.get("/joinquant/dev/fred/apikey").await.unwrap(), "abc123");
    }

    #[tokio::test]
    async fn test_missing_parameter_is_unavailable() {
        let dir = tempdir().unwrap();
        let store = FileParameterStore::new(dir.path());

        let err = store.get("/joinquant/dev/fred/series1").await.unwrap_err();
        assert!(matches!(err, AppError::ConfigUnavailable(_)));
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let dir = tempdir().unwrap();
        let store = FileParameterStore::new(dir.path());

        assert!(store.get("/../etc/passwd").await.is_err());
        assert!(store.get("/").await.is_err());
    }
}
