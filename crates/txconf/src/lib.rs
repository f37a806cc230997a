//! Configuration loading for the TxGemma tool server.
//!
//! Minimal dependencies; knows nothing about prompts or tools beyond the
//! settings that select them.
//!
//! # Usage
//!
//! ```rust,no_run
//! use txconf::TxConfig;
//!
//! let config = TxConfig::load().expect("Failed to load config");
//!
//! println!("Predict model: {}", config.predict.model);
//! if let Some(placeholder) = &config.tools.filter_placeholder {
//!     println!("Tools filtered to: {}", placeholder);
//! }
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/txgemma/config.toml` (system)
//! 2. `~/.config/txgemma/config.toml` (user)
//! 3. `./txgemma.toml` (local override, or the path given with `--config`)
//! 4. Environment variables (`TXGEMMA_*`)
//!
//! A file only changes the keys it sets.
//!
//! # Example Config
//!
//! ```toml
//! [predict]
//! model = "google/txgemma-9b-predict"
//! max_new_tokens = 64
//!
//! [chat]
//! model = "google/txgemma-9b-chat"
//!
//! [tools]
//! filter_placeholder = "Drug SMILES"   # "" exposes every tool
//! max_placeholders = 2
//! enable_chat = true
//!
//! [tools.prompts]
//! filename = "tdc_prompts.json"
//! local_override = "~/txgemma/tdc_prompts.json"
//!
//! [telemetry]
//! log_level = "info"
//! ```

pub mod loader;
pub mod sections;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use sections::{ChatConfig, PredictConfig, PromptsConfig, TelemetryConfig, ToolsConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Complete TxGemma configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TxConfig {
    #[serde(default)]
    pub predict: PredictConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl TxConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load with `config_path` in place of `./txgemma.toml`, then apply env overrides.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        Self::load_layers(
            loader::discover_config_files_with_override(config_path),
            loader::process_env,
        )
    }

    /// Overlay `files` in order on the defaults, then variables from `lookup`.
    pub fn load_layers<F>(
        files: impl IntoIterator<Item = PathBuf>,
        lookup: F,
    ) -> Result<(Self, ConfigSources), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut sources = ConfigSources::default();
        let mut config = TxConfig::default();

        for path in files {
            loader::apply_file(&mut config, &path)?;
            sources.files.push(path);
        }

        loader::apply_overrides_from(&mut config, &mut sources, lookup);

        Ok((config, sources))
    }

    /// Serialize the effective config to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let body = toml::to_string_pretty(self)?;
        Ok(format!("# TxGemma Configuration\n\n{}", body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = TxConfig::default();
        assert_eq!(config.predict.model, "google/txgemma-2b-predict");
        assert_eq!(config.tools.filter_placeholder.as_deref(), Some("Drug SMILES"));
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn test_to_toml_reads_back() {
        let mut config = TxConfig::default();
        config.tools.max_placeholders = Some(2);
        config.tools.prompts.local_override = Some(PathBuf::from("/data/prompts.json"));

        let text = config.to_toml().unwrap();
        assert!(text.starts_with("# TxGemma Configuration"));
        assert!(text.contains("[predict]"));
        assert!(text.contains("[tools.prompts]"));

        let back: TxConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_load_layers_file_then_env() {
        let mut system = tempfile::NamedTempFile::new().unwrap();
        writeln!(system, "[chat]\nmodel = \"system/chat\"\n[tools]\nmax_placeholders = 3").unwrap();
        let mut local = tempfile::NamedTempFile::new().unwrap();
        writeln!(local, "[chat]\nmodel = \"custom/chat\"").unwrap();

        let files = vec![system.path().to_path_buf(), local.path().to_path_buf()];
        let (config, sources) = TxConfig::load_layers(files.clone(), |_| None).unwrap();

        assert_eq!(sources.files, files);
        assert!(sources.env_overrides.is_empty());
        assert_eq!(config.chat.model, "custom/chat");
        assert_eq!(config.tools.max_placeholders, Some(3));
        assert_eq!(config.predict, PredictConfig::default());

        let (config, sources) = TxConfig::load_layers(files, |key| {
            (key == "TXGEMMA_CHAT_MODEL").then(|| "env/chat".to_string())
        })
        .unwrap();
        assert_eq!(config.chat.model, "env/chat");
        assert_eq!(sources.env_overrides, vec!["TXGEMMA_CHAT_MODEL"]);
    }

    #[test]
    fn test_load_layers_without_files_is_default() {
        let (config, sources) = TxConfig::load_layers(Vec::new(), |_| None).unwrap();
        assert_eq!(config, TxConfig::default());
        assert!(sources.files.is_empty());
    }

    #[test]
    fn test_load_layers_bad_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[chat\nmodel = ").unwrap();

        let err = TxConfig::load_layers(vec![file.path().to_path_buf()], |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
