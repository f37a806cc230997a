//! txprompt - TDC prompt templates as callable tools
//!
//! Turns a catalog of TxGemma prompt templates into MCP-style tool
//! descriptors. Each template body names its inputs with `{Placeholder}`
//! spans; the crate indexes templates by placeholder and infers a JSON
//! Schema for every tool from the placeholder names alone.
//!
//! # Components
//!
//! - **Template**: placeholder extraction, rendering, descriptions
//! - **Repository**: lazy loading from a local file or the HuggingFace Hub,
//!   plus the placeholder index and its filters
//! - **Schema**: type, description and pattern inference
//! - **Catalog**: filtered tool generation and analytics
//! - **Dispatch**: rendering tool calls and handing them to a model
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use txprompt::{PromptRepository, PromptSource, ToolCatalog, ToolFilter};
//!
//! let repo = Arc::new(PromptRepository::new(PromptSource::local("tdc_prompts.json")));
//! let catalog = ToolCatalog::new(repo);
//!
//! let tools = catalog.build_tools(&ToolFilter::placeholder("Drug SMILES"))?;
//! for tool in &tools {
//!     println!("{}: {}", tool.name, tool.description);
//! }
//! # Ok::<(), txprompt::PromptError>(())
//! ```

pub mod catalog;
pub mod dispatch;
pub mod error;
pub mod repository;
pub mod schema;
pub mod source;
pub mod template;
pub mod tool;

pub use catalog::{ToolAnalysis, ToolCatalog, ToolFilter, ToolSubsets, COMPLEXITY_THRESHOLD};
pub use dispatch::{
    agent_description, chat_tool, DispatchError, Generator, ToolDispatcher, CHAT_TOOL_NAME,
};
pub use error::{PromptError, Result};
pub use repository::{PromptRepository, SMILES_PLACEHOLDER, TARGET_SEQUENCE_PLACEHOLDER};
pub use schema::{
    build_tool_from_template, placeholder_description, placeholder_pattern, placeholder_type,
};
pub use source::{HfHubFetcher, HubFetcher, PromptSource, DEFAULT_FILENAME, DEFAULT_HF_REPO};
pub use template::{PromptTemplate, TemplateMetadata};
pub use tool::{CallToolResult, Content, JsonType, PropertySchema, Tool, ToolSchema};
