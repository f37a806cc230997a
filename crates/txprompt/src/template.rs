//! A single TDC prompt template and its placeholders.
//!
//! Placeholders are `{Name}` spans whose interior holds no braces, e.g.
//! `{Drug SMILES}` or `{Epitope amino acid sequence}`. Names are used verbatim:
//! no trimming, no case folding.
//!
//! The scan is one brace level deep and has no escaping, so `{{x}}` yields `x`
//! and `{outer {inner} outer}` yields only `inner`. Rendering substitutes with the
//! same rule, so extraction and rendering always agree.

use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use crate::error::{PromptError, Result};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").expect("valid placeholder regex"));

const CONTEXT_PREFIX: &str = "Context:";
const DISPLAY_DESCRIPTION_LIMIT: usize = 80;

/// One named prompt template. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    name: String,
    template: String,
    metadata: Map<String, Value>,
    placeholders: Vec<String>,
}

/// Display projection of a template, mostly for tooling and debugging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateMetadata {
    pub name: String,
    pub description: String,
    pub required_inputs: Vec<String>,
    pub placeholder_count: usize,
}

impl PromptTemplate {
    pub fn new(
        name: impl Into<String>,
        template: impl Into<String>,
        metadata: Option<Map<String, Value>>,
    ) -> Self {
        let template = template.into();
        let placeholders = extract_placeholders(&template);
        Self {
            name: name.into(),
            template,
            metadata: metadata.unwrap_or_default(),
            placeholders,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw template body.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Unique placeholder names in first-seen order.
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    pub fn placeholder_count(&self) -> usize {
        self.placeholders.len()
    }

    /// Placeholder names as a set (membership only).
    pub fn required_inputs(&self) -> HashSet<&str> {
        self.placeholders.iter().map(String::as_str).collect()
    }

    pub fn has_placeholder(&self, placeholder: &str) -> bool {
        self.placeholders.iter().any(|p| p == placeholder)
    }

    /// Render the template with the given values.
    ///
    /// Every placeholder must have a value; extra keys are ignored. Strings are
    /// substituted as-is, other JSON values by their JSON text.
    pub fn format(&self, values: &Map<String, Value>) -> Result<String> {
        let mut missing: Vec<String> = self
            .placeholders
            .iter()
            .filter(|p| !values.contains_key(p.as_str()))
            .cloned()
            .collect();

        if !missing.is_empty() {
            missing.sort();
            return Err(PromptError::MissingPlaceholders {
                template: self.name.clone(),
                missing,
            });
        }

        let rendered = PLACEHOLDER.replace_all(&self.template, |caps: &Captures| {
            values
                .get(&caps[1])
                .map_or_else(|| caps[0].to_string(), value_text)
        });

        Ok(rendered.into_owned())
    }

    /// Short human-readable description for tool listings.
    pub fn get_description(&self) -> String {
        if let Some(description) = self.metadata.get("description") {
            return value_text(description);
        }

        for line in self.template.lines() {
            if let Some(context) = line.trim().strip_prefix(CONTEXT_PREFIX) {
                return context.trim().to_string();
            }
        }

        format!("TxGemma prediction task: {}", self.name)
    }

    pub fn to_metadata(&self) -> TemplateMetadata {
        TemplateMetadata {
            name: self.name.clone(),
            description: self.get_description(),
            required_inputs: self.sorted_inputs(),
            placeholder_count: self.placeholder_count(),
        }
    }

    fn sorted_inputs(&self) -> Vec<String> {
        let mut inputs = self.placeholders.clone();
        inputs.sort();
        inputs
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inputs = self.sorted_inputs();
        let inputs = if inputs.is_empty() {
            "none".to_string()
        } else {
            inputs.join(", ")
        };

        let mut description = self.get_description();
        if description.chars().count() > DISPLAY_DESCRIPTION_LIMIT {
            description = description
                .chars()
                .take(DISPLAY_DESCRIPTION_LIMIT - 3)
                .collect::<String>()
                + "...";
        }

        write!(
            f,
            "PromptTemplate(name='{}', inputs=[{}], placeholders={}, description='{}')",
            self.name,
            inputs,
            self.placeholder_count(),
            description
        )
    }
}

fn extract_placeholders(template: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    PLACEHOLDER
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
