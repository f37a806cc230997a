//! Process-wide state, built once at startup and passed down explicitly.

use std::path::PathBuf;
use std::sync::Arc;
use txconf::{ConfigSources, TxConfig};
use txprompt::{PromptRepository, PromptSource, ToolCatalog, ToolFilter};

pub struct AppContext {
    pub config: TxConfig,
    pub sources: ConfigSources,
    pub repository: Arc<PromptRepository>,
    pub catalog: ToolCatalog,
}

impl AppContext {
    /// Build the context. `prompts_override` wins over the configured local override.
    pub fn new(mut config: TxConfig, sources: ConfigSources, prompts_override: Option<PathBuf>) -> Self {
        if let Some(path) = prompts_override {
            config.tools.prompts.local_override = Some(path);
        }

        let repository = Arc::new(PromptRepository::new(prompt_source(&config)));
        let catalog = ToolCatalog::new(Arc::clone(&repository));

        Self {
            config,
            sources,
            repository,
            catalog,
        }
    }

    /// The tool selection the server would expose.
    pub fn configured_filter(&self) -> ToolFilter {
        configured_filter(&self.config)
    }
}

/// Local override if configured, otherwise the prompts file in the predict model's repo.
pub fn prompt_source(config: &TxConfig) -> PromptSource {
    match &config.tools.prompts.local_override {
        Some(path) => PromptSource::local(path),
        None => PromptSource::hub(&config.predict.model, &config.tools.prompts.filename),
    }
}

pub fn configured_filter(config: &TxConfig) -> ToolFilter {
    ToolFilter {
        placeholder: config.tools.filter_placeholder.clone(),
        max_placeholders: config.tools.max_placeholders,
        ..ToolFilter::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_source_is_hub() {
        let config = TxConfig::default();
        assert_eq!(
            prompt_source(&config),
            PromptSource::hub("google/txgemma-2b-predict", "tdc_prompts.json")
        );
    }

    #[test]
    fn test_hub_source_follows_predict_model() {
        let mut config = TxConfig::default();
        config.predict.model = "google/txgemma-9b-predict".to_string();
        config.tools.prompts.filename = "custom.json".to_string();

        assert_eq!(
            prompt_source(&config),
            PromptSource::hub("google/txgemma-9b-predict", "custom.json")
        );
    }

    #[test]
    fn test_cli_prompts_override() {
        let mut config = TxConfig::default();
        config.tools.prompts.local_override = Some(PathBuf::from("/from/config.json"));

        let ctx = AppContext::new(
            config,
            ConfigSources::default(),
            Some(PathBuf::from("/from/cli.json")),
        );
        assert_eq!(
            ctx.repository.prompt_source(),
            &PromptSource::local("/from/cli.json")
        );
        assert!(!ctx.repository.is_loaded());
    }

    #[test]
    fn test_configured_filter() {
        let mut config = TxConfig::default();
        config.tools.max_placeholders = Some(2);

        let filter = configured_filter(&config);
        assert_eq!(filter.placeholder.as_deref(), Some("Drug SMILES"));
        assert_eq!(filter.max_placeholders, Some(2));
        assert!(filter.exact_match);

        config.tools.filter_placeholder = None;
        assert_eq!(configured_filter(&config).placeholder, None);
    }
}
