//! Where prompt definitions come from.
//!
//! Either a local JSON file (the override used in development) or a named file
//! inside a HuggingFace model repository.

use anyhow::Context;
use hf_hub::api::sync::Api;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{PromptError, Result};

pub const DEFAULT_HF_REPO: &str = "google/txgemma-2b-predict";
pub const DEFAULT_FILENAME: &str = "tdc_prompts.json";

/// Fetches a file from a remote artifact repository and returns its local path.
///
/// Timeouts and retries are the fetcher's business; the repository never retries.
pub trait HubFetcher: Send + Sync {
    fn fetch(&self, repo_id: &str, filename: &str) -> anyhow::Result<PathBuf>;
}

/// Fetcher backed by the HuggingFace Hub sync API and its local cache.
#[derive(Debug, Default)]
pub struct HfHubFetcher;

impl HubFetcher for HfHubFetcher {
    fn fetch(&self, repo_id: &str, filename: &str) -> anyhow::Result<PathBuf> {
        let api = Api::new().context("Failed to initialize HuggingFace Hub API")?;
        debug!(repo_id, filename, "Fetching prompts from HuggingFace Hub");
        api.model(repo_id.to_string())
            .get(filename)
            .with_context(|| format!("Failed to download {}", filename))
    }
}

/// Source-selection parameters for a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSource {
    /// A local JSON document; must exist at load time.
    Local(PathBuf),
    /// A file inside a HuggingFace model repository.
    Hub { repo_id: String, filename: String },
}

impl PromptSource {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local(path.into())
    }

    pub fn hub(repo_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self::Hub {
            repo_id: repo_id.into(),
            filename: filename.into(),
        }
    }

    /// Resolve to a readable local path, fetching remotely if needed.
    pub(crate) fn resolve(&self, fetcher: &dyn HubFetcher) -> Result<PathBuf> {
        match self {
            Self::Local(path) => {
                if !path.exists() {
                    return Err(PromptError::SourceNotFound { path: path.clone() });
                }
                Ok(path.clone())
            }
            Self::Hub { repo_id, filename } => {
                fetcher
                    .fetch(repo_id, filename)
                    .map_err(|e| PromptError::Fetch {
                        repo_id: repo_id.clone(),
                        filename: filename.clone(),
                        message: format!("{:#}", e),
                    })
            }
        }
    }
}

impl Default for PromptSource {
    fn default() -> Self {
        Self::hub(DEFAULT_HF_REPO, DEFAULT_FILENAME)
    }
}

impl fmt::Display for PromptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "local file: {}", path.display()),
            Self::Hub { repo_id, filename } => write!(f, "HuggingFace: {}/{}", repo_id, filename),
        }
    }
}

/// Read the raw JSON document at `path`.
pub(crate) fn read_document(path: &Path) -> Result<serde_json::Value> {
    let contents = std::fs::read_to_string(path).map_err(|e| PromptError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&contents).map_err(|e| {
        PromptError::invalid_format(
            path.display().to_string(),
            format!("Invalid JSON in prompts file: {}", e),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct FailingFetcher;

    impl HubFetcher for FailingFetcher {
        fn fetch(&self, _repo_id: &str, _filename: &str) -> anyhow::Result<PathBuf> {
            anyhow::bail!("network unreachable")
        }
    }

    #[test]
    fn test_default_source() {
        assert_eq!(
            PromptSource::default(),
            PromptSource::hub("google/txgemma-2b-predict", "tdc_prompts.json")
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            PromptSource::local("/tmp/p.json").to_string(),
            "local file: /tmp/p.json"
        );
        assert_eq!(
            PromptSource::default().to_string(),
            "HuggingFace: google/txgemma-2b-predict/tdc_prompts.json"
        );
    }

    #[test]
    fn test_missing_local_is_not_found() {
        let err = PromptSource::local("/definitely/not/here.json")
            .resolve(&HfHubFetcher)
            .unwrap_err();
        assert!(matches!(err, PromptError::SourceNotFound { .. }));
    }

    #[test]
    fn test_fetch_failure_is_wrapped() {
        let err = PromptSource::hub("org/repo", "prompts.json")
            .resolve(&FailingFetcher)
            .unwrap_err();

        match err {
            PromptError::Fetch {
                repo_id,
                filename,
                message,
            } => {
                assert_eq!(repo_id, "org/repo");
                assert_eq!(filename, "prompts.json");
                assert!(message.contains("network unreachable"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_read_document_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = read_document(file.path()).unwrap_err();
        assert!(err.is_invalid_format());
        assert!(err.to_string().contains("Invalid JSON"));
    }

    #[test]
    fn test_read_document_non_utf8_is_read_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[b'{', 0xff, 0xfe, b'}']).unwrap();

        let err = read_document(file.path()).unwrap_err();
        assert!(!err.is_invalid_format());
        match err {
            PromptError::Read { source, .. } => {
                assert_eq!(source.kind(), std::io::ErrorKind::InvalidData)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
