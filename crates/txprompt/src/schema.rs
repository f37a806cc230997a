//! Schema synthesis from placeholder names.
//!
//! Types, descriptions and validation patterns are inferred from the name
//! alone through small ordered rule tables. Rules are checked top to bottom
//! against the lower-cased name and the first hit wins. Matching is by
//! substring over the whole name, so "Disease" infers boolean through "is".
//! Generated schemas for the existing catalog depend on that, so the keyword
//! sets and their order must stay as they are.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{PromptError, Result};
use crate::template::PromptTemplate;
use crate::tool::{JsonType, PropertySchema, Tool, ToolSchema};

/// Keyword rules for type inference, in priority order.
const TYPE_RULES: &[(&[&str], JsonType)] = &[
    (&["count", "number", "quantity", "index"], JsonType::Integer),
    (&["dose", "concentration", "score", "value"], JsonType::Number),
    (&["is", "has", "can", "should"], JsonType::Boolean),
];

pub const SMILES_PATTERN: &str = r"^[A-Za-z0-9@+\-\[\]\(\)=#$:\.]+$";
pub const AMINO_ACID_PATTERN: &str = r"^[ACDEFGHIKLMNPQRSTVWY]+$";
pub const TRIAL_PHASE_PATTERN: &str = r"^[1-3]$";

/// Keyword rules for validation patterns, in priority order.
const PATTERN_RULES: &[(&[&str], &str)] = &[
    (&["smiles"], SMILES_PATTERN),
    (&["sequence", "epitope"], AMINO_ACID_PATTERN),
    (&["phase"], TRIAL_PHASE_PATTERN),
];

/// Hand-written descriptions for well-known placeholder names (exact match).
const KNOWN_DESCRIPTIONS: &[(&str, &str)] = &[
    ("Drug SMILES", "SMILES string representation of the drug molecule"),
    ("Product SMILES", "SMILES string of the product/target molecule"),
    ("Molecule SMILES", "SMILES string of the molecule"),
    ("Target sequence", "Amino acid sequence of the target protein"),
    ("Protein sequence", "Amino acid sequence of the protein"),
    (
        "Epitope amino acid sequence",
        "Amino acid sequence of the epitope region",
    ),
    ("Indication", "Disease or medical condition being treated"),
    ("Disease", "Name of the disease or medical condition"),
    ("Trial phase", "Clinical trial phase (1, 2, or 3)"),
    ("Phase", "Clinical development phase"),
    ("Cell line", "Cell line identifier (e.g., HeLa, MCF-7, A549)"),
    ("Dosage", "Drug dosage amount and unit"),
    ("Dose", "Administered dose of the drug"),
    ("Property name", "Name of the molecular property to predict"),
    ("Target name", "Name or identifier of the biological target"),
];

fn first_match<'a, T: Copy>(rules: &'a [(&'a [&'a str], T)], name: &str) -> Option<T> {
    let lower = name.to_lowercase();
    rules
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, value)| *value)
}

/// Infer the JSON type of a placeholder. Defaults to string.
pub fn placeholder_type(placeholder: &str) -> JsonType {
    first_match(TYPE_RULES, placeholder).unwrap_or(JsonType::String)
}

/// Human-readable description, annotated with usage when shared by several tools.
pub fn placeholder_description(placeholder: &str, usage_count: Option<usize>) -> String {
    let mut description = KNOWN_DESCRIPTIONS
        .iter()
        .find(|(name, _)| *name == placeholder)
        .map(|(_, text)| text.to_string())
        .unwrap_or_else(|| {
            let readable: String = placeholder
                .replace('_', " ")
                .chars()
                .filter(|c| *c != '{' && *c != '}')
                .collect();
            format!("Input parameter: {}", readable)
        });

    if let Some(count) = usage_count.filter(|&count| count > 1) {
        description.push_str(&format!(" (used in {} tools)", count));
    }
    description
}

/// Validation regex for a placeholder's values, if one applies.
pub fn placeholder_pattern(placeholder: &str) -> Option<&'static str> {
    first_match(PATTERN_RULES, placeholder)
}

/// Full property schema for one placeholder.
pub fn property_schema(placeholder: &str, usage_count: Option<usize>) -> PropertySchema {
    PropertySchema {
        json_type: placeholder_type(placeholder),
        description: placeholder_description(placeholder, usage_count),
        pattern: placeholder_pattern(placeholder).map(str::to_string),
    }
}

/// Build a tool descriptor from a template.
///
/// `placeholder_stats` (placeholder → number of templates using it) enriches
/// property descriptions. Fails when `metadata.description` is present but
/// not a string.
pub fn build_tool_from_template(
    template: &PromptTemplate,
    placeholder_stats: Option<&BTreeMap<String, usize>>,
) -> Result<Tool> {
    let description = match template.metadata().get("description") {
        Some(Value::String(_)) | None => template.get_description(),
        Some(other) => {
            return Err(PromptError::invalid_format(
                template.name(),
                format!(
                    "Tool '{}' description must be a string, got {}",
                    template.name(),
                    other
                ),
            ))
        }
    };

    let mut properties = Map::new();
    for placeholder in template.placeholders() {
        let usage = placeholder_stats.and_then(|stats| stats.get(placeholder).copied());
        let schema = property_schema(placeholder, usage);
        properties.insert(placeholder.clone(), serde_json::to_value(&schema)?);
    }

    let schema = ToolSchema::closed(properties, template.placeholders().to_vec());
    Ok(Tool::new(template.name(), description).with_input_schema(schema))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use regex::Regex;
    use serde_json::json;

    #[test]
    fn test_type_inference() {
        assert_eq!(placeholder_type("Drug SMILES"), JsonType::String);
        assert_eq!(placeholder_type("Atom count"), JsonType::Integer);
        assert_eq!(placeholder_type("Residue index"), JsonType::Integer);
        assert_eq!(placeholder_type("Dose"), JsonType::Number);
        assert_eq!(placeholder_type("Binding score"), JsonType::Number);
        assert_eq!(placeholder_type("Has label"), JsonType::Boolean);
    }

    #[test]
    fn test_type_keywords() {
        let cases = [
            ("Atom count", JsonType::Integer),
            ("Cell number", JsonType::Integer),
            ("Sample quantity", JsonType::Integer),
            ("Residue index", JsonType::Integer),
            ("Initial dose", JsonType::Number),
            ("Ligand concentration", JsonType::Number),
            ("Docking score", JsonType::Number),
            ("Measured value", JsonType::Number),
            ("Is active", JsonType::Boolean),
            ("Has label", JsonType::Boolean),
            ("Can bind", JsonType::Boolean),
            ("Should filter", JsonType::Boolean),
        ];

        for (name, expected) in cases {
            assert_eq!(placeholder_type(name), expected, "type of {name:?}");
        }
    }

    #[test]
    fn test_type_priority_order() {
        // integer beats number, number beats boolean
        assert_eq!(placeholder_type("Count value"), JsonType::Integer);
        assert_eq!(placeholder_type("Is dose"), JsonType::Number);
    }

    #[test]
    fn test_type_substring_false_positive() {
        assert_eq!(placeholder_type("Disease"), JsonType::Boolean);
        assert_eq!(placeholder_type("Dosage"), JsonType::String);
    }

    #[test]
    fn test_known_descriptions() {
        assert_eq!(
            placeholder_description("Drug SMILES", None),
            "SMILES string representation of the drug molecule"
        );
        assert_eq!(
            placeholder_description("Trial phase", Some(1)),
            "Clinical trial phase (1, 2, or 3)"
        );
        assert_eq!(KNOWN_DESCRIPTIONS.len(), 15);
    }

    #[test]
    fn test_description_fallback_and_usage() {
        assert_eq!(
            placeholder_description("assay_type", None),
            "Input parameter: assay type"
        );
        assert_eq!(
            placeholder_description("Drug SMILES", Some(42)),
            "SMILES string representation of the drug molecule (used in 42 tools)"
        );
        assert_eq!(
            placeholder_description("Unknown", Some(0)),
            "Input parameter: Unknown"
        );
    }

    #[test]
    fn test_patterns() {
        assert_eq!(placeholder_pattern("Drug SMILES"), Some(SMILES_PATTERN));
        assert_eq!(placeholder_pattern("Target sequence"), Some(AMINO_ACID_PATTERN));
        assert_eq!(placeholder_pattern("Epitope region"), Some(AMINO_ACID_PATTERN));
        assert_eq!(
            placeholder_pattern("Epitope amino acid sequence"),
            Some(AMINO_ACID_PATTERN)
        );
        assert_eq!(placeholder_pattern("Trial phase"), Some(TRIAL_PHASE_PATTERN));
        assert_eq!(placeholder_pattern("Disease"), None);
    }

    #[test]
    fn test_patterns_validate_values() {
        let smiles = Regex::new(SMILES_PATTERN).unwrap();
        assert!(smiles.is_match("CC(=O)OC1=CC=CC=C1C(=O)O"));
        assert!(smiles.is_match("[Na+].[Cl-]"));
        assert!(!smiles.is_match("not smiles!"));

        let amino = Regex::new(AMINO_ACID_PATTERN).unwrap();
        assert!(amino.is_match("MKTAYIAKQR"));
        assert!(!amino.is_match("MKTBX"));
        assert!(!amino.is_match("mktayiak"));

        let phase = Regex::new(TRIAL_PHASE_PATTERN).unwrap();
        assert!(phase.is_match("2"));
        assert!(!phase.is_match("4"));
        assert!(!phase.is_match("12"));
    }

    #[test]
    fn test_build_tool_single_placeholder() {
        let template = PromptTemplate::new(
            "predict_tox",
            "Question: predict toxicity of {Drug SMILES}",
            None,
        );
        let tool = build_tool_from_template(&template, None).unwrap();

        assert_eq!(tool.name, "predict_tox");
        assert_eq!(tool.description, "TxGemma prediction task: predict_tox");
        assert_eq!(tool.input_schema.required, vec!["Drug SMILES"]);
        assert!(!tool.input_schema.additional_properties);
        assert_eq!(
            tool.input_schema.properties["Drug SMILES"],
            json!({
                "type": "string",
                "description": "SMILES string representation of the drug molecule",
                "pattern": SMILES_PATTERN
            })
        );
    }

    #[test]
    fn test_build_tool_preserves_order_and_stats() {
        let template = PromptTemplate::new(
            "dti",
            "Target: {Target sequence}\nDrug: {Drug SMILES}\nCount: {Atom count}",
            None,
        );
        let stats = BTreeMap::from([
            ("Drug SMILES".to_string(), 3),
            ("Target sequence".to_string(), 1),
        ]);
        let tool = build_tool_from_template(&template, Some(&stats)).unwrap();

        assert_eq!(
            tool.parameter_names().collect::<Vec<_>>(),
            vec!["Target sequence", "Drug SMILES", "Atom count"]
        );
        assert_eq!(
            tool.input_schema.required,
            vec!["Target sequence", "Drug SMILES", "Atom count"]
        );
        let props = &tool.input_schema.properties;
        assert!(props["Drug SMILES"]["description"]
            .as_str()
            .unwrap()
            .ends_with("(used in 3 tools)"));
        assert!(!props["Target sequence"]["description"]
            .as_str()
            .unwrap()
            .contains("used in"));
        assert_eq!(props["Atom count"]["type"], "integer");
        assert!(props["Atom count"].get("pattern").is_none());
    }

    #[test]
    fn test_build_tool_without_placeholders() {
        let template = PromptTemplate::new("static", "Context: Static task.\nAnswer:", None);
        let tool = build_tool_from_template(&template, None).unwrap();

        assert_eq!(tool.description, "Static task.");
        assert!(tool.input_schema.properties.is_empty());
        assert!(tool.input_schema.required.is_empty());
    }

    #[test]
    fn test_build_tool_rejects_non_string_description() {
        let metadata = json!({"description": 7});
        let template = PromptTemplate::new(
            "bad",
            "{Drug SMILES}",
            metadata.as_object().cloned(),
        );

        let err = build_tool_from_template(&template, None).unwrap_err();
        assert!(err.is_invalid_format());
        assert!(err.to_string().contains("bad"));
    }
}
