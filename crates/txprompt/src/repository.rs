//! Lazily loaded prompt repository with a reverse placeholder index.
//!
//! The repository starts unloaded and materializes on first use. `load()` is
//! idempotent; `reload()` drops the current state and loads again. A failed
//! load leaves the repository unloaded: there is never a partial catalog.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{error, info};

use crate::error::{PromptError, Result};
use crate::source::{read_document, HfHubFetcher, HubFetcher, PromptSource};
use crate::template::PromptTemplate;

/// Canonical drug-structure placeholder.
pub const SMILES_PLACEHOLDER: &str = "Drug SMILES";
/// Canonical target-protein placeholder.
pub const TARGET_SEQUENCE_PLACEHOLDER: &str = "Target sequence";

const AVAILABLE_HINT_LIMIT: usize = 5;

/// Materialized repository state. Rebuilt in full on every load.
#[derive(Debug)]
struct LoadedPrompts {
    templates: Vec<Arc<PromptTemplate>>,
    positions: HashMap<String, usize>,
    placeholder_index: BTreeMap<String, BTreeSet<String>>,
    source: String,
}

impl LoadedPrompts {
    fn new(templates: Vec<PromptTemplate>, source: String) -> Self {
        let templates: Vec<Arc<PromptTemplate>> = templates.into_iter().map(Arc::new).collect();
        let positions = templates
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name().to_string(), i))
            .collect();
        let placeholder_index = build_placeholder_index(&templates);

        Self {
            templates,
            positions,
            placeholder_index,
            source,
        }
    }

    fn get(&self, name: &str) -> Option<&Arc<PromptTemplate>> {
        self.positions.get(name).map(|&i| &self.templates[i])
    }

    /// Templates whose names are in `names`, in source order.
    fn select(&self, names: &BTreeSet<String>) -> Vec<Arc<PromptTemplate>> {
        self.templates
            .iter()
            .filter(|t| names.contains(t.name()))
            .cloned()
            .collect()
    }

    fn filter<F>(&self, predicate: F) -> Vec<Arc<PromptTemplate>>
    where
        F: Fn(&PromptTemplate) -> bool,
    {
        self.templates
            .iter()
            .filter(|t| predicate(t))
            .cloned()
            .collect()
    }
}

/// Placeholder → names of the templates that declare it.
fn build_placeholder_index(templates: &[Arc<PromptTemplate>]) -> BTreeMap<String, BTreeSet<String>> {
    let mut index: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for template in templates {
        for placeholder in template.placeholders() {
            index
                .entry(placeholder.clone())
                .or_default()
                .insert(template.name().to_string());
        }
    }
    index
}

/// Parse a prompts document into templates, failing on the first bad entry.
fn parse_document(document: Value, origin: &str) -> Result<Vec<PromptTemplate>> {
    let entries = match document {
        Value::Object(entries) => entries,
        other => {
            return Err(PromptError::invalid_format(
                origin,
                format!(
                    "Prompts JSON must be an object, got {}",
                    json_type_name(&other)
                ),
            ))
        }
    };

    let mut templates = Vec::with_capacity(entries.len());
    for (name, content) in entries {
        match parse_entry(&name, content) {
            Ok(template) => templates.push(template),
            Err(e) => {
                error!(name = %name, error = %e, "Failed to load prompt");
                return Err(e);
            }
        }
    }
    Ok(templates)
}

fn parse_entry(name: &str, content: Value) -> Result<PromptTemplate> {
    match content {
        Value::String(body) => Ok(PromptTemplate::new(name, body, None)),
        Value::Object(mut fields) => {
            let body = match fields.remove("template") {
                Some(Value::String(body)) => body,
                Some(other) => {
                    return Err(PromptError::invalid_format(
                        name,
                        format!(
                            "Prompt '{}' has a non-string 'template' field ({})",
                            name,
                            json_type_name(&other)
                        ),
                    ))
                }
                None => {
                    return Err(PromptError::invalid_format(
                        name,
                        format!("Prompt '{}' missing 'template' field", name),
                    ))
                }
            };

            let metadata = match fields.remove("metadata") {
                None | Some(Value::Null) => Map::new(),
                Some(Value::Object(metadata)) => metadata,
                Some(other) => {
                    return Err(PromptError::invalid_format(
                        name,
                        format!(
                            "Prompt '{}' has non-object 'metadata' ({})",
                            name,
                            json_type_name(&other)
                        ),
                    ))
                }
            };

            Ok(PromptTemplate::new(name, body, Some(metadata)))
        }
        other => Err(PromptError::invalid_format(
            name,
            format!(
                "Invalid prompt format for '{}': expected string or object, got {}",
                name,
                json_type_name(&other)
            ),
        )),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Loads and indexes TDC prompt templates from a [`PromptSource`].
pub struct PromptRepository {
    source: PromptSource,
    fetcher: Box<dyn HubFetcher>,
    state: RwLock<Option<Arc<LoadedPrompts>>>,
}

impl PromptRepository {
    /// Repository over `source`, fetching remote sources from the HuggingFace Hub.
    pub fn new(source: PromptSource) -> Self {
        Self::with_fetcher(source, Box::new(HfHubFetcher))
    }

    /// Repository with a custom remote fetcher.
    pub fn with_fetcher(source: PromptSource, fetcher: Box<dyn HubFetcher>) -> Self {
        Self {
            source,
            fetcher,
            state: RwLock::new(None),
        }
    }

    pub fn prompt_source(&self) -> &PromptSource {
        &self.source
    }

    pub fn is_loaded(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Where the prompts were loaded from, or `None` before the first load.
    pub fn source(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|loaded| loaded.source.clone())
    }

    /// Load prompts if not already loaded.
    pub fn load(&self) -> Result<()> {
        self.loaded().map(|_| ())
    }

    /// Drop the loaded state and load again from the source.
    pub fn reload(&self) -> Result<()> {
        info!("Reloading prompts...");
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *state = None;
        let loaded = Arc::new(self.fetch()?);
        *state = Some(loaded);
        Ok(())
    }

    /// The loaded state, loading it first if needed.
    ///
    /// The write lock is held across the fetch so concurrent first callers do
    /// not fetch twice.
    fn loaded(&self) -> Result<Arc<LoadedPrompts>> {
        if let Some(loaded) = self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(Arc::clone(loaded));
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(loaded) = state.as_ref() {
            return Ok(Arc::clone(loaded));
        }

        let loaded = Arc::new(self.fetch()?);
        *state = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    fn fetch(&self) -> Result<LoadedPrompts> {
        let path = self.source.resolve(self.fetcher.as_ref())?;
        let origin = self.source.to_string();

        let document = read_document(&path)?;
        if let Value::Object(entries) = &document {
            info!(count = entries.len(), source = %origin, "Loaded prompt definitions");
        }

        let templates = parse_document(document, &origin)?;
        let loaded = LoadedPrompts::new(templates, origin);

        info!(
            templates = loaded.templates.len(),
            placeholders = loaded.placeholder_index.len(),
            "Successfully loaded templates"
        );
        Ok(loaded)
    }

    // ---- Accessors ----

    /// Get a template by name.
    pub fn get(&self, name: &str) -> Result<Arc<PromptTemplate>> {
        let loaded = self.loaded()?;
        if let Some(template) = loaded.get(name) {
            return Ok(Arc::clone(template));
        }

        let mut names: Vec<&str> = loaded.templates.iter().map(|t| t.name()).collect();
        names.sort_unstable();
        names.truncate(AVAILABLE_HINT_LIMIT);

        Err(PromptError::TemplateNotFound {
            name: name.to_string(),
            available: names.join(", "),
        })
    }

    pub fn has_template(&self, name: &str) -> Result<bool> {
        Ok(self.loaded()?.positions.contains_key(name))
    }

    /// Alias of [`has_template`](Self::has_template).
    pub fn contains(&self, name: &str) -> Result<bool> {
        self.has_template(name)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.loaded()?.templates.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// All templates in source order.
    pub fn all(&self) -> Result<Vec<Arc<PromptTemplate>>> {
        Ok(self.loaded()?.templates.clone())
    }

    /// All template names in source order.
    pub fn list(&self) -> Result<Vec<String>> {
        Ok(self
            .loaded()?
            .templates
            .iter()
            .map(|t| t.name().to_string())
            .collect())
    }

    // ---- Placeholder discovery ----

    /// Every placeholder used by at least one template.
    pub fn all_placeholders(&self) -> Result<BTreeSet<String>> {
        Ok(self.loaded()?.placeholder_index.keys().cloned().collect())
    }

    /// Names of the templates that use `placeholder`; empty if unknown.
    pub fn placeholder_usage(&self, placeholder: &str) -> Result<BTreeSet<String>> {
        Ok(self
            .loaded()?
            .placeholder_index
            .get(placeholder)
            .cloned()
            .unwrap_or_default())
    }

    /// Placeholder → number of templates using it.
    pub fn placeholder_stats(&self) -> Result<BTreeMap<String, usize>> {
        Ok(self
            .loaded()?
            .placeholder_index
            .iter()
            .map(|(placeholder, names)| (placeholder.clone(), names.len()))
            .collect())
    }

    /// Placeholders by usage count, descending. Ties keep alphabetical order.
    pub fn most_common_placeholders(&self, top_n: usize) -> Result<Vec<(String, usize)>> {
        let mut stats: Vec<(String, usize)> = self.placeholder_stats()?.into_iter().collect();
        stats.sort_by(|a, b| b.1.cmp(&a.1));
        stats.truncate(top_n);
        Ok(stats)
    }

    // ---- Filtering ----

    /// Templates using `placeholder`.
    ///
    /// Exact mode reads the index. Fuzzy mode matches `placeholder` as a
    /// case-insensitive substring of any placeholder name.
    pub fn filter_by_placeholder(
        &self,
        placeholder: &str,
        exact: bool,
    ) -> Result<Vec<Arc<PromptTemplate>>> {
        let loaded = self.loaded()?;

        if exact {
            return Ok(loaded
                .placeholder_index
                .get(placeholder)
                .map(|names| loaded.select(names))
                .unwrap_or_default());
        }

        let needle = placeholder.to_lowercase();
        Ok(loaded.filter(|t| {
            t.placeholders()
                .iter()
                .any(|p| p.to_lowercase().contains(&needle))
        }))
    }

    /// Templates using all (`match_all`) or any of `placeholders`.
    pub fn filter_by_placeholders<S: AsRef<str>>(
        &self,
        placeholders: &[S],
        match_all: bool,
    ) -> Result<Vec<Arc<PromptTemplate>>> {
        let loaded = self.loaded()?;

        Ok(loaded.filter(|t| {
            let mut wanted = placeholders.iter().map(|p| t.has_placeholder(p.as_ref()));
            if match_all {
                wanted.all(|present| present)
            } else {
                wanted.any(|present| present)
            }
        }))
    }

    /// Templates that take a drug SMILES string.
    pub fn smiles_prompts(&self) -> Result<Vec<Arc<PromptTemplate>>> {
        self.filter_by_placeholder(SMILES_PLACEHOLDER, true)
    }

    /// Templates with any sequence-like placeholder.
    pub fn sequence_prompts(&self) -> Result<Vec<Arc<PromptTemplate>>> {
        self.filter_by_placeholder("sequence", false)
    }

    /// Templates with at most `max_placeholders` placeholders.
    pub fn simple_prompts(&self, max_placeholders: usize) -> Result<Vec<Arc<PromptTemplate>>> {
        Ok(self
            .loaded()?
            .filter(|t| t.placeholder_count() <= max_placeholders))
    }

    /// Templates with at least `min_placeholders` placeholders.
    pub fn complex_prompts(&self, min_placeholders: usize) -> Result<Vec<Arc<PromptTemplate>>> {
        Ok(self
            .loaded()?
            .filter(|t| t.placeholder_count() >= min_placeholders))
    }
}

impl std::fmt::Debug for PromptRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptRepository")
            .field("source", &self.source)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
