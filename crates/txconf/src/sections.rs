//! Configuration sections and their defaults.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::PathBuf;

/// Prediction model settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictConfig {
    /// HuggingFace model id. Also names the repository the prompts come from.
    /// Default: google/txgemma-2b-predict
    #[serde(default = "PredictConfig::default_model")]
    pub model: String,

    /// Default: 64
    #[serde(default = "PredictConfig::default_max_new_tokens")]
    pub max_new_tokens: u32,
}

impl PredictConfig {
    fn default_model() -> String {
        "google/txgemma-2b-predict".to_string()
    }

    fn default_max_new_tokens() -> u32 {
        64
    }
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            model: Self::default_model(),
            max_new_tokens: Self::default_max_new_tokens(),
        }
    }
}

/// Chat model settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Default: google/txgemma-9b-chat
    #[serde(default = "ChatConfig::default_model")]
    pub model: String,

    /// Default: 100
    #[serde(default = "ChatConfig::default_max_new_tokens")]
    pub max_new_tokens: u32,
}

impl ChatConfig {
    fn default_model() -> String {
        "google/txgemma-9b-chat".to_string()
    }

    fn default_max_new_tokens() -> u32 {
        100
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: Self::default_model(),
            max_new_tokens: Self::default_max_new_tokens(),
        }
    }
}

/// Where the prompt definitions come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptsConfig {
    /// File name inside the predict model's repository.
    /// Default: tdc_prompts.json
    #[serde(default = "PromptsConfig::default_filename")]
    pub filename: String,

    /// Local JSON file used instead of the hub download.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_override: Option<PathBuf>,
}

impl PromptsConfig {
    fn default_filename() -> String {
        "tdc_prompts.json".to_string()
    }
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            filename: Self::default_filename(),
            local_override: None,
        }
    }
}

/// Which tools are exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Only expose tools using this placeholder; `None` exposes all.
    /// Written as `""` when unset so the file reads back the same.
    /// Default: Drug SMILES
    #[serde(
        default = "ToolsConfig::default_filter_placeholder",
        deserialize_with = "deserialize_filter",
        serialize_with = "serialize_filter"
    )]
    pub filter_placeholder: Option<String>,

    /// Placeholder ceiling per tool; `None` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_placeholders: Option<usize>,

    /// Default: true
    #[serde(default = "ToolsConfig::default_enable_chat")]
    pub enable_chat: bool,

    #[serde(default)]
    pub prompts: PromptsConfig,
}

impl ToolsConfig {
    fn default_filter_placeholder() -> Option<String> {
        Some("Drug SMILES".to_string())
    }

    fn default_enable_chat() -> bool {
        true
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            filter_placeholder: Self::default_filter_placeholder(),
            max_placeholders: None,
            enable_chat: Self::default_enable_chat(),
            prompts: PromptsConfig::default(),
        }
    }
}

/// `null`, `none` and the empty string all mean "no filter".
pub fn parse_filter_placeholder(value: &str) -> Option<String> {
    match value.to_lowercase().as_str() {
        "" | "null" | "none" => None,
        _ => Some(value.to_string()),
    }
}

fn serialize_filter<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_deref().unwrap_or(""))
}

fn deserialize_filter<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = String::deserialize(deserializer)?;
    Ok(parse_filter_placeholder(&value))
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
