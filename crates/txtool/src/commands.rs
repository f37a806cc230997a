//! CLI command implementations

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use txprompt::{
    agent_description, build_tool_from_template, chat_tool, Tool, ToolFilter, COMPLEXITY_THRESHOLD,
};

use crate::context::AppContext;

const PREVIEW_LINES: usize = 10;
const EXAMPLE_LIMIT: usize = 3;
const SUMMARY_LIMIT: usize = 5;

/// Parse a `KEY=VALUE` argument. Only the first `=` splits, so keys may hold spaces.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

fn print_section(title: &str) {
    let rule = "=".repeat(70);
    println!("\n{}\n  {}\n{}\n", rule, title, rule);
}

/// `tools` filter flags, as given on the command line.
#[derive(Debug, Default)]
pub struct ToolSelection {
    pub placeholder: Option<String>,
    pub fuzzy: bool,
    pub placeholders: Vec<String>,
    pub any: bool,
    pub simple: bool,
    pub complex: bool,
}

impl ToolSelection {
    /// Catalog filter plus a human label for the listing header.
    fn filter(&self) -> (ToolFilter, String) {
        if let Some(placeholder) = &self.placeholder {
            let mut filter = ToolFilter::placeholder(placeholder.clone());
            if self.fuzzy {
                filter = filter.fuzzy();
            }
            let mode = if self.fuzzy { "fuzzy" } else { "exact" };
            return (filter, format!("using '{}' ({} match)", placeholder, mode));
        }

        if !self.placeholders.is_empty() {
            let mut filter = ToolFilter::placeholders(self.placeholders.clone());
            if self.any {
                filter = filter.match_any();
            }
            let mode = if self.any { "ANY" } else { "ALL" };
            return (
                filter,
                format!("using {} of: {}", mode, self.placeholders.join(", ")),
            );
        }

        if self.simple {
            return (
                ToolFilter::all().max_placeholders(COMPLEXITY_THRESHOLD),
                format!("simple (at most {} placeholders)", COMPLEXITY_THRESHOLD),
            );
        }

        if self.complex {
            return (
                ToolFilter::all(),
                format!("complex (more than {} placeholders)", COMPLEXITY_THRESHOLD),
            );
        }

        (ToolFilter::all(), "all".to_string())
    }
}

fn tool_summary(tool: &Tool) -> Value {
    json!({
        "name": tool.name,
        "description": tool.description,
        "parameters": tool.input_schema.required,
        "parameter_count": tool.input_schema.required.len(),
        "properties": tool.input_schema.properties,
    })
}

pub fn placeholders(ctx: &AppContext, as_json: bool, verbose: bool) -> Result<()> {
    let repo = &ctx.repository;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&repo.placeholder_stats()?)?);
        return Ok(());
    }

    let ranked = repo.most_common_placeholders(usize::MAX)?;
    print_section("Available Placeholders");
    println!(
        "Found {} unique placeholder{}\n",
        ranked.len(),
        plural(ranked.len())
    );

    for (placeholder, count) in ranked {
        println!("  {:<40} ({} tool{})", placeholder, count, plural(count));
        if verbose {
            let users = repo.placeholder_usage(&placeholder)?;
            let examples: Vec<&str> = users.iter().take(EXAMPLE_LIMIT).map(String::as_str).collect();
            println!("     Used in: {}", examples.join(", "));
            if users.len() > EXAMPLE_LIMIT {
                println!("              ... and {} more", users.len() - EXAMPLE_LIMIT);
            }
        }
    }
    Ok(())
}

pub fn tools(ctx: &AppContext, selection: &ToolSelection, as_json: bool, verbose: bool) -> Result<()> {
    let (filter, label) = selection.filter();
    let mut tools = ctx.catalog.build_tools(&filter)?;
    if selection.complex && selection.placeholder.is_none() && selection.placeholders.is_empty() {
        tools.retain(|t| t.input_schema.required.len() > COMPLEXITY_THRESHOLD);
    }

    if as_json {
        let summaries: Vec<Value> = tools.iter().map(tool_summary).collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    print_section(&format!("Tools ({})", label));
    println!("Found {} tool{}\n", tools.len(), plural(tools.len()));

    tools.sort_by(|a, b| {
        (a.input_schema.required.len(), &a.name).cmp(&(b.input_schema.required.len(), &b.name))
    });
    for tool in &tools {
        let params = &tool.input_schema.required;
        println!("  {}", tool.name);
        println!("     {}", tool.description);
        println!("     Parameters ({}): {}", params.len(), params.join(", "));

        if verbose && !params.is_empty() {
            println!("     Details:");
            for param in params {
                let prop = tool.input_schema.properties.get(param);
                let param_type = prop
                    .and_then(|p| p.get("type"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                let param_desc = prop
                    .and_then(|p| p.get("description"))
                    .and_then(Value::as_str)
                    .unwrap_or("No description");
                println!("       - {} ({}): {}", param, param_type, param_desc);
            }
        }
        println!();
    }

    stats(ctx, false)?;
    subsets(ctx, false, verbose)
}

pub fn template(ctx: &AppContext, name: &str) -> Result<()> {
    let template = ctx.repository.get(name)?;

    print_section(&format!("Template: {}", template.name()));
    println!("Description:\n  {}\n", template.get_description());

    println!("Placeholders ({}):", template.placeholder_count());
    for placeholder in template.placeholders() {
        println!("  - {}", placeholder);
    }

    if !template.metadata().is_empty() {
        println!("\nMetadata:");
        for (key, value) in template.metadata() {
            println!("  {}: {}", key, value);
        }
    }

    println!("\nTemplate Preview:");
    let lines: Vec<&str> = template.template().lines().collect();
    for (i, line) in lines.iter().take(PREVIEW_LINES).enumerate() {
        println!("  {:2}. {}", i + 1, line);
    }
    if lines.len() > PREVIEW_LINES {
        println!("  ... ({} more lines)", lines.len() - PREVIEW_LINES);
    }

    let stats = ctx.repository.placeholder_stats()?;
    match build_tool_from_template(&template, Some(&stats)) {
        Ok(tool) => {
            println!("\nGenerated tool:");
            println!("  Tool name: {}", tool.name);
            println!("  Parameters: {}", tool.input_schema.required.join(", "));
            println!("\nAgent description:");
            for line in agent_description(&tool).lines() {
                println!("  {}", line);
            }
        }
        Err(e) => println!("\nNo tool generated: {}", e),
    }
    Ok(())
}

pub fn stats(ctx: &AppContext, as_json: bool) -> Result<()> {
    let analysis = ctx.catalog.analyze_tools()?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    print_section("Tool Statistics");
    println!("  Total tools:              {}", analysis.total_tools);
    println!("  Unique placeholders:      {}", analysis.total_placeholders);
    println!("  Simple tools (<=2 params): {}", analysis.simple_tools);
    println!("  Complex tools (>2 params): {}", analysis.complex_tools);

    println!("\n  Tools by complexity:");
    for (count, tools) in &analysis.tools_by_complexity {
        println!(
            "    {} parameter{}:  {:2} tool{}",
            count,
            plural(*count),
            tools,
            plural(*tools)
        );
    }

    println!("\n  Most common placeholders:");
    for (placeholder, count) in analysis.most_common_placeholders.iter().take(SUMMARY_LIMIT) {
        println!("    {:<40} ({:2} tools)", placeholder, count);
    }
    Ok(())
}

pub fn subsets(ctx: &AppContext, as_json: bool, verbose: bool) -> Result<()> {
    let subsets = ctx.catalog.suggest_tool_subsets()?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&subsets)?);
        return Ok(());
    }

    print_section("Suggested Tool Subsets");
    for (use_case, names) in subsets.iter() {
        println!("  {}:", use_case.replace('_', " "));
        println!("    {} tool{}", names.len(), plural(names.len()));

        let mut sorted = names.to_vec();
        sorted.sort();
        if verbose {
            for name in &sorted {
                println!("      - {}", name);
            }
        } else if !sorted.is_empty() {
            let examples = &sorted[..sorted.len().min(EXAMPLE_LIMIT)];
            println!("    Examples: {}", examples.join(", "));
            if sorted.len() > EXAMPLE_LIMIT {
                println!("              ... and {} more", sorted.len() - EXAMPLE_LIMIT);
            }
        }
        println!();
    }
    Ok(())
}

pub fn source(ctx: &AppContext) -> Result<()> {
    let count = ctx.repository.len()?;
    print_section("Prompt Source");
    println!(
        "  Loaded from: {}",
        ctx.repository
            .source()
            .unwrap_or_else(|| "Not loaded yet".to_string())
    );
    println!("  Total templates: {}", count);
    Ok(())
}

pub fn render(ctx: &AppContext, name: &str, args: Vec<(String, String)>) -> Result<()> {
    let values: Map<String, Value> = args
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();

    let template = ctx.repository.get(name)?;
    let prompt = template
        .format(&values)
        .with_context(|| format!("Failed to render '{}'", name))?;
    println!("{}", prompt);
    Ok(())
}

pub fn info(ctx: &AppContext) -> Result<()> {
    let filter = ctx.configured_filter();
    let tools = ctx.catalog.build_tools(&filter)?;
    let analysis = ctx.catalog.analyze_tools()?;

    print_section("TxGemma MCP Server");
    println!("Server Configuration:");
    println!("  Tools loaded:          {}", tools.len());
    println!("  Total available tools: {}", analysis.total_tools);
    println!("  Unique placeholders:   {}", analysis.total_placeholders);
    match &filter.placeholder {
        Some(placeholder) => println!("  Tool filter:           {}", placeholder),
        None => println!("  Tool filter:           none"),
    }
    if let Some(max) = filter.max_placeholders {
        println!("  Max placeholders:      {}", max);
    }

    println!("\nModels:");
    println!("  Predict: {}", ctx.config.predict.model);
    if ctx.config.tools.enable_chat {
        println!("  Chat:    {} (tool: {})", ctx.config.chat.model, chat_tool().name);
    } else {
        println!("  Chat:    disabled");
    }

    let names: Vec<&str> = tools.iter().take(SUMMARY_LIMIT).map(|t| t.name.as_str()).collect();
    let more = if tools.len() > SUMMARY_LIMIT { "..." } else { "" };
    println!("\nCurrent Tools: {}{}", names.join(", "), more);

    println!("\nMost Common Placeholders:");
    for (placeholder, count) in analysis.most_common_placeholders.iter().take(SUMMARY_LIMIT) {
        println!("  - {}: {} tools", placeholder, count);
    }
    Ok(())
}

pub fn config(ctx: &AppContext) -> Result<()> {
    print!("{}", ctx.config.to_toml()?);

    println!("\n# Sources");
    if ctx.sources.files.is_empty() {
        println!("#   files: none (defaults)");
    }
    for file in &ctx.sources.files {
        println!("#   file: {}", file.display());
    }
    for var in &ctx.sources.env_overrides {
        println!("#   env:  {}", var);
    }
    Ok(())
}
