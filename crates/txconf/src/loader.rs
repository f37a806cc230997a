//! Config file discovery, loading, and environment variable overlay.

use crate::sections::parse_filter_placeholder;
use crate::{ConfigError, TxConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local). Only existing files.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// An existing `cli_path` replaces the local `./txgemma.toml`.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/txgemma/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("txgemma/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("txgemma.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Overlay the TOML file at `path` onto `config`.
pub fn apply_file(config: &mut TxConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    apply_toml(config, &contents, path)
}

/// Overlay TOML text onto `config`. Only keys present in the text change.
fn apply_toml(config: &mut TxConfig, contents: &str, path: &Path) -> Result<(), ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let Some(predict) = table.get("predict").and_then(|v| v.as_table()) {
        if let Some(v) = predict.get("model").and_then(|v| v.as_str()) {
            config.predict.model = v.to_string();
        }
        if let Some(v) = predict.get("max_new_tokens").and_then(|v| v.as_integer()) {
            config.predict.max_new_tokens = v as u32;
        }
    }

    if let Some(chat) = table.get("chat").and_then(|v| v.as_table()) {
        if let Some(v) = chat.get("model").and_then(|v| v.as_str()) {
            config.chat.model = v.to_string();
        }
        if let Some(v) = chat.get("max_new_tokens").and_then(|v| v.as_integer()) {
            config.chat.max_new_tokens = v as u32;
        }
    }

    if let Some(tools) = table.get("tools").and_then(|v| v.as_table()) {
        if let Some(v) = tools.get("filter_placeholder").and_then(|v| v.as_str()) {
            config.tools.filter_placeholder = parse_filter_placeholder(v);
        }
        if let Some(v) = tools.get("max_placeholders").and_then(|v| v.as_integer()) {
            // Negative means unlimited.
            config.tools.max_placeholders = usize::try_from(v).ok();
        }
        if let Some(v) = tools.get("enable_chat").and_then(|v| v.as_bool()) {
            config.tools.enable_chat = v;
        }

        if let Some(prompts) = tools.get("prompts").and_then(|v| v.as_table()) {
            if let Some(v) = prompts.get("filename").and_then(|v| v.as_str()) {
                config.tools.prompts.filename = v.to_string();
            }
            if let Some(v) = prompts.get("local_override").and_then(|v| v.as_str()) {
                config.tools.prompts.local_override = if v.is_empty() {
                    None
                } else {
                    Some(expand_path(v))
                };
            }
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("log_level").and_then(|v| v.as_str()) {
            config.telemetry.log_level = v.to_string();
        }
    }

    Ok(())
}

/// Variable lookup against the process environment.
pub fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Apply overrides from an arbitrary variable lookup.
pub fn apply_overrides_from<F>(config: &mut TxConfig, sources: &mut ConfigSources, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let mut record = |key: &str| sources.env_overrides.push(key.to_string());

    if let Some(v) = lookup("TXGEMMA_PREDICT_MODEL") {
        config.predict.model = v;
        record("TXGEMMA_PREDICT_MODEL");
    }

    if let Some(v) = lookup("TXGEMMA_CHAT_MODEL") {
        config.chat.model = v;
        record("TXGEMMA_CHAT_MODEL");
    }
    if let Some(v) = lookup("TXGEMMA_CHAT_MAX_TOKENS") {
        if let Ok(tokens) = v.trim().parse() {
            config.chat.max_new_tokens = tokens;
            record("TXGEMMA_CHAT_MAX_TOKENS");
        }
    }

    if let Some(v) = lookup("TXGEMMA_FILTER_PLACEHOLDER") {
        config.tools.filter_placeholder = parse_filter_placeholder(&v);
        record("TXGEMMA_FILTER_PLACEHOLDER");
    }
    if let Some(v) = lookup("TXGEMMA_MAX_PLACEHOLDERS") {
        let v = v.trim();
        if matches!(v.to_lowercase().as_str(), "" | "null" | "none") {
            config.tools.max_placeholders = None;
            record("TXGEMMA_MAX_PLACEHOLDERS");
        } else if let Ok(max) = v.parse() {
            config.tools.max_placeholders = Some(max);
            record("TXGEMMA_MAX_PLACEHOLDERS");
        }
    }
    if let Some(v) = lookup("TXGEMMA_PROMPTS_FILE") {
        config.tools.prompts.local_override = Some(expand_path(&v));
        record("TXGEMMA_PROMPTS_FILE");
    }

    if let Some(v) = lookup("TXGEMMA_LOG_LEVEL") {
        config.telemetry.log_level = v;
        record("TXGEMMA_LOG_LEVEL");
    }
}

/// Expand a leading `~/` or `$VAR/` in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        return directories::BaseDirs::new()
            .map(|d| d.home_dir().join(stripped))
            .unwrap_or_else(|| PathBuf::from(path));
    }

    if let Some(stripped) = path.strip_prefix('$') {
        let (var_name, rest) = match stripped.find('/') {
            Some(slash) => (&stripped[..slash], Some(&stripped[slash + 1..])),
            None => (stripped, None),
        };
        return match (env::var(var_name), rest) {
            (Ok(value), Some(rest)) => PathBuf::from(value).join(rest),
            (Ok(value), None) => PathBuf::from(value),
            (Err(_), _) => PathBuf::from(path),
        };
    }

    PathBuf::from(path)
}
