//! Error types for prompt loading, rendering and tool synthesis.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the prompt repository and templates.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Prompt '{name}' not found. Available prompts include: {available}...")]
    TemplateNotFound { name: String, available: String },

    #[error("Local override not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("Failed to download prompts from HuggingFace ({repo_id}/{filename}): {message}")]
    Fetch {
        repo_id: String,
        filename: String,
        message: String,
    },

    /// The file could not be read as text. Bytes that are not UTF-8 land
    /// here rather than in `InvalidFormat`.
    #[error("Failed to read prompts file ({}): {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid prompt format ({origin}): {message}")]
    InvalidFormat { origin: String, message: String },

    #[error("Missing required placeholders for '{template}': {missing:?}")]
    MissingPlaceholders {
        template: String,
        missing: Vec<String>,
    },

    #[error("Failed to encode schema: {0}")]
    Schema(#[from] serde_json::Error),
}

impl PromptError {
    pub(crate) fn invalid_format(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            origin: origin.into(),
            message: message.into(),
        }
    }

    /// True for both a missing template name and a missing local source file.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TemplateNotFound { .. } | Self::SourceNotFound { .. }
        )
    }

    /// True for every malformed-document variant.
    pub fn is_invalid_format(&self) -> bool {
        matches!(self, Self::InvalidFormat { .. })
    }
}

pub type Result<T> = std::result::Result<T, PromptError>;
