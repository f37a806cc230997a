//! txtool - explore the TxGemma TDC tool catalog
//!
//! Subcommands:
//! - `txtool placeholders` - Placeholders with usage counts
//! - `txtool tools` - Generated tools, optionally filtered
//! - `txtool template <name>` - One template and the tool built from it
//! - `txtool stats` / `txtool subsets` - Catalog analytics
//! - `txtool render <name> -a KEY=VALUE` - Render a prompt
//! - `txtool info` / `txtool source` / `txtool config` - Server setup

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use txconf::TxConfig;

mod commands;
mod context;

use context::AppContext;

#[derive(Parser)]
#[command(name = "txtool")]
#[command(about = "Analyze TxGemma MCP tools and prompts")]
#[command(version)]
struct Cli {
    /// Config file used instead of ./txgemma.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Local prompts JSON file (skips the HuggingFace download)
    #[arg(long, global = true)]
    prompts: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List placeholders with usage counts
    Placeholders {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show generated tools
    Tools {
        /// Only tools using this placeholder (e.g., "Drug SMILES")
        #[arg(long, conflicts_with = "placeholders")]
        placeholder: Option<String>,

        /// Case-insensitive substring match for --placeholder
        #[arg(long, requires = "placeholder")]
        fuzzy: bool,

        /// Only tools using these placeholders
        #[arg(long, num_args = 1..)]
        placeholders: Vec<String>,

        /// Match ANY of --placeholders (default: ALL)
        #[arg(long, requires = "placeholders")]
        any: bool,

        /// Only simple tools (at most 2 placeholders)
        #[arg(long, conflicts_with = "complex")]
        simple: bool,

        /// Only complex tools (3 or more placeholders)
        #[arg(long)]
        complex: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show details for one template
    Template {
        /// Template name (e.g., "BBB_Martins")
        name: String,
    },

    /// Catalog statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Suggested tool subsets by use case
    Subsets {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show where prompts are loaded from
    Source,

    /// Render a template's prompt
    Render {
        /// Template name
        name: String,

        /// Placeholder value as KEY=VALUE (repeatable)
        #[arg(short = 'a', long = "arg", value_parser = commands::parse_key_val)]
        args: Vec<(String, String)>,
    },

    /// Server summary for the configured tool selection
    Info,

    /// Show the effective configuration and its sources
    Config,
}

fn init_logging(config: &TxConfig, verbose: bool) {
    let mut filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.telemetry.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    if verbose {
        filter = filter.add_directive(tracing::Level::INFO.into());
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = TxConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    init_logging(&config, cli.verbose);

    let ctx = AppContext::new(config, sources, cli.prompts);
    let verbose = cli.verbose;

    match cli.command {
        Commands::Placeholders { json } => commands::placeholders(&ctx, json, verbose)?,
        Commands::Tools {
            placeholder,
            fuzzy,
            placeholders,
            any,
            simple,
            complex,
            json,
        } => {
            let selection = commands::ToolSelection {
                placeholder,
                fuzzy,
                placeholders,
                any,
                simple,
                complex,
            };
            commands::tools(&ctx, &selection, json, verbose)?;
        }
        Commands::Template { name } => commands::template(&ctx, &name)?,
        Commands::Stats { json } => commands::stats(&ctx, json)?,
        Commands::Subsets { json } => commands::subsets(&ctx, json, verbose)?,
        Commands::Source => commands::source(&ctx)?,
        Commands::Render { name, args } => commands::render(&ctx, &name, args)?,
        Commands::Info => commands::info(&ctx)?,
        Commands::Config => commands::config(&ctx)?,
    }

    Ok(())
}
