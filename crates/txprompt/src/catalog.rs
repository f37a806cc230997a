//! Tool catalog: filtered tool generation and catalog analytics.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::Result;
use crate::repository::{PromptRepository, SMILES_PLACEHOLDER, TARGET_SEQUENCE_PLACEHOLDER};
use crate::schema::build_tool_from_template;
use crate::template::PromptTemplate;
use crate::tool::Tool;

/// Placeholder ceiling applied by `exclude_complex` and used by the analysis split.
pub const COMPLEXITY_THRESHOLD: usize = 2;

const TOP_PLACEHOLDERS: usize = 10;

/// Template selection for tool generation.
///
/// Selection uses exactly one source: the single placeholder if set, else the
/// placeholder list if non-empty, else every template. The result is then
/// capped by `max_placeholders`, or by [`COMPLEXITY_THRESHOLD`] when only
/// `exclude_complex` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFilter {
    pub placeholder: Option<String>,
    pub placeholders: Vec<String>,
    pub match_all: bool,
    pub exact_match: bool,
    pub exclude_complex: bool,
    pub max_placeholders: Option<usize>,
}

impl Default for ToolFilter {
    fn default() -> Self {
        Self {
            placeholder: None,
            placeholders: Vec::new(),
            match_all: true,
            exact_match: true,
            exclude_complex: false,
            max_placeholders: None,
        }
    }
}

impl ToolFilter {
    /// No filtering: every template.
    pub fn all() -> Self {
        Self::default()
    }

    /// Templates using `placeholder` (exact match unless changed).
    pub fn placeholder(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: Some(placeholder.into()),
            ..Self::default()
        }
    }

    /// Templates using all of `placeholders` (unless changed with `match_any`).
    pub fn placeholders<I, S>(placeholders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            placeholders: placeholders.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Case-insensitive substring match for the single placeholder.
    pub fn fuzzy(mut self) -> Self {
        self.exact_match = false;
        self
    }

    /// Any listed placeholder suffices.
    pub fn match_any(mut self) -> Self {
        self.match_all = false;
        self
    }

    pub fn exclude_complex(mut self) -> Self {
        self.exclude_complex = true;
        self
    }

    pub fn max_placeholders(mut self, max: usize) -> Self {
        self.max_placeholders = Some(max);
        self
    }

    fn ceiling(&self) -> Option<usize> {
        self.max_placeholders
            .or(self.exclude_complex.then_some(COMPLEXITY_THRESHOLD))
    }
}

/// Aggregate report over the whole catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolAnalysis {
    pub total_tools: usize,
    pub total_placeholders: usize,
    pub placeholder_usage: BTreeMap<String, usize>,
    /// Placeholder count → number of templates with exactly that count.
    pub tools_by_complexity: BTreeMap<usize, usize>,
    pub most_common_placeholders: Vec<(String, usize)>,
    pub simple_tools: usize,
    pub complex_tools: usize,
}

/// Named use-case buckets of tool names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolSubsets {
    pub drug_discovery: Vec<String>,
    pub protein_analysis: Vec<String>,
    pub simple_predictions: Vec<String>,
    pub drug_target_interaction: Vec<String>,
}

impl ToolSubsets {
    /// Buckets as (name, tool names) pairs in a fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &[String])> {
        [
            ("drug_discovery", self.drug_discovery.as_slice()),
            ("protein_analysis", self.protein_analysis.as_slice()),
            ("simple_predictions", self.simple_predictions.as_slice()),
            (
                "drug_target_interaction",
                self.drug_target_interaction.as_slice(),
            ),
        ]
        .into_iter()
    }
}

/// Builds tool descriptors from a shared repository.
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    repository: Arc<PromptRepository>,
}

impl ToolCatalog {
    pub fn new(repository: Arc<PromptRepository>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<PromptRepository> {
        &self.repository
    }

    /// Candidate templates for `filter`, in source order.
    fn select(&self, filter: &ToolFilter) -> Result<Vec<Arc<PromptTemplate>>> {
        let candidates = match filter.placeholder.as_deref() {
            Some(placeholder) if !placeholder.is_empty() => self
                .repository
                .filter_by_placeholder(placeholder, filter.exact_match)?,
            _ if !filter.placeholders.is_empty() => self
                .repository
                .filter_by_placeholders(&filter.placeholders, filter.match_all)?,
            _ => self.repository.all()?,
        };

        Ok(match filter.ceiling() {
            Some(max) => candidates
                .into_iter()
                .filter(|t| t.placeholder_count() <= max)
                .collect(),
            None => candidates,
        })
    }

    /// Build tool descriptors for the selected templates.
    ///
    /// A template that fails synthesis is logged and skipped; the rest of the
    /// catalog is still returned. Repository load errors propagate.
    pub fn build_tools(&self, filter: &ToolFilter) -> Result<Vec<Tool>> {
        let stats = self.repository.placeholder_stats()?;
        let templates = self.select(filter)?;

        let mut tools = Vec::with_capacity(templates.len());
        for template in &templates {
            match build_tool_from_template(template, Some(&stats)) {
                Ok(tool) => {
                    info!(
                        name = %template.name(),
                        parameters = template.placeholder_count(),
                        "Built tool"
                    );
                    tools.push(tool);
                }
                Err(e) => {
                    error!(name = %template.name(), error = %e, "Failed to build tool");
                }
            }
        }

        info!(
            built = tools.len(),
            total = self.repository.len()?,
            "Successfully built tools"
        );
        Ok(tools)
    }

    /// Names of the selected templates, without synthesizing schemas.
    pub fn get_tool_names(&self, filter: &ToolFilter) -> Result<Vec<String>> {
        Ok(self
            .select(filter)?
            .iter()
            .map(|t| t.name().to_string())
            .collect())
    }

    pub fn analyze_tools(&self) -> Result<ToolAnalysis> {
        let templates = self.repository.all()?;
        let placeholder_usage = self.repository.placeholder_stats()?;

        let mut tools_by_complexity: BTreeMap<usize, usize> = BTreeMap::new();
        for template in &templates {
            *tools_by_complexity
                .entry(template.placeholder_count())
                .or_default() += 1;
        }

        let simple_tools = templates
            .iter()
            .filter(|t| t.placeholder_count() <= COMPLEXITY_THRESHOLD)
            .count();

        Ok(ToolAnalysis {
            total_tools: templates.len(),
            total_placeholders: placeholder_usage.len(),
            most_common_placeholders: self.repository.most_common_placeholders(TOP_PLACEHOLDERS)?,
            placeholder_usage,
            tools_by_complexity,
            simple_tools,
            complex_tools: templates.len() - simple_tools,
        })
    }

    pub fn suggest_tool_subsets(&self) -> Result<ToolSubsets> {
        Ok(ToolSubsets {
            drug_discovery: self.get_tool_names(&ToolFilter::placeholder(SMILES_PLACEHOLDER))?,
            protein_analysis: self.get_tool_names(&ToolFilter::placeholder("sequence").fuzzy())?,
            simple_predictions: self.get_tool_names(
                &ToolFilter::placeholder(SMILES_PLACEHOLDER).max_placeholders(1),
            )?,
            drug_target_interaction: self.get_tool_names(&ToolFilter::placeholders([
                SMILES_PLACEHOLDER,
                TARGET_SEQUENCE_PLACEHOLDER,
            ]))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::PromptSource;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CATALOG: &str = r#"{
        "tox": "Context: Toxicity.\n{Drug SMILES}",
        "dti": "{Drug SMILES} {Target sequence}",
        "epitope": "{Epitope amino acid sequence}",
        "trial": "{Drug SMILES} {Disease} {Trial phase}",
        "broken": {"template": "{Drug SMILES}", "metadata": {"description": ["not", "text"]}},
        "static": "No inputs."
    }"#;

    fn catalog() -> (NamedTempFile, ToolCatalog) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CATALOG.as_bytes()).unwrap();
        let repo = PromptRepository::new(PromptSource::local(file.path()));
        (file, ToolCatalog::new(Arc::new(repo)))
    }

    fn tool_names(tools: &[Tool]) -> Vec<&str> {
        tools.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_build_all_skips_failures() {
        let (_file, catalog) = catalog();
        let tools = catalog.build_tools(&ToolFilter::all()).unwrap();

        assert_eq!(
            tool_names(&tools),
            vec!["tox", "dti", "epitope", "trial", "static"]
        );
        assert_eq!(tools[0].description, "Toxicity.");
    }

    #[test]
    fn test_build_uses_global_stats() {
        let (_file, catalog) = catalog();
        let tools = catalog
            .build_tools(&ToolFilter::placeholder("Drug SMILES").max_placeholders(1))
            .unwrap();

        assert_eq!(tool_names(&tools), vec!["tox"]);
        let description = tools[0].input_schema.properties["Drug SMILES"]["description"]
            .as_str()
            .unwrap();
        assert!(description.ends_with("(used in 4 tools)"));
    }

    #[test]
    fn test_selection_precedence() {
        let (_file, catalog) = catalog();
        let filter = ToolFilter {
            placeholder: Some("Disease".to_string()),
            placeholders: vec!["Target sequence".to_string()],
            ..ToolFilter::default()
        };
        assert_eq!(catalog.get_tool_names(&filter).unwrap(), vec!["trial"]);
    }

    #[test]
    fn test_empty_placeholder_means_no_filter() {
        let (_file, catalog) = catalog();
        let filter = ToolFilter::placeholder("");
        assert_eq!(catalog.get_tool_names(&filter).unwrap().len(), 6);
    }

    #[test]
    fn test_complexity_ceiling() {
        let (_file, catalog) = catalog();

        let simple = catalog
            .get_tool_names(&ToolFilter::all().exclude_complex())
            .unwrap();
        assert_eq!(simple, vec!["tox", "dti", "epitope", "broken", "static"]);

        // An explicit ceiling wins over exclude_complex.
        let filter = ToolFilter::all().exclude_complex().max_placeholders(0);
        assert_eq!(catalog.get_tool_names(&filter).unwrap(), vec!["static"]);
    }

    #[test]
    fn test_multi_placeholder_modes() {
        let (_file, catalog) = catalog();
        let both = ToolFilter::placeholders(["Drug SMILES", "Target sequence"]);

        assert_eq!(catalog.get_tool_names(&both).unwrap(), vec!["dti"]);
        assert_eq!(
            catalog.get_tool_names(&both.clone().match_any()).unwrap(),
            vec!["tox", "dti", "trial", "broken"]
        );
    }

    #[test]
    fn test_analyze_tools() {
        let (_file, catalog) = catalog();
        let analysis = catalog.analyze_tools().unwrap();

        assert_eq!(analysis.total_tools, 6);
        assert_eq!(analysis.total_placeholders, 5);
        assert_eq!(analysis.placeholder_usage["Drug SMILES"], 4);
        assert_eq!(
            analysis.tools_by_complexity,
            BTreeMap::from([(0, 1), (1, 3), (2, 1), (3, 1)])
        );
        assert_eq!(
            analysis.most_common_placeholders[0],
            ("Drug SMILES".to_string(), 4)
        );
        assert_eq!(analysis.simple_tools, 5);
        assert_eq!(analysis.complex_tools, 1);
        assert_eq!(
            analysis.simple_tools + analysis.complex_tools,
            analysis.total_tools
        );
    }

    #[test]
    fn test_suggest_tool_subsets() {
        let (_file, catalog) = catalog();
        let subsets = catalog.suggest_tool_subsets().unwrap();

        assert_eq!(subsets.drug_discovery, vec!["tox", "dti", "trial", "broken"]);
        assert_eq!(subsets.protein_analysis, vec!["dti", "epitope"]);
        assert_eq!(subsets.simple_predictions, vec!["tox", "broken"]);
        assert_eq!(subsets.drug_target_interaction, vec!["dti"]);
        assert_eq!(subsets.iter().count(), 4);
    }
}
