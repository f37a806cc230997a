//! Tool dispatch: render a prompt for a tool call and hand it to a model.
//!
//! Model inference is a collaborator behind [`Generator`]; nothing here loads
//! weights or tokenizes. Failures never escape [`ToolDispatcher::call_tool`]:
//! they come back as error results whose text starts with `ERROR: `.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::catalog::{ToolCatalog, ToolFilter};
use crate::error::PromptError;
use crate::repository::PromptRepository;
use crate::tool::{CallToolResult, Tool, ToolSchema};

/// Name of the conversational tool.
pub const CHAT_TOOL_NAME: &str = "txgemma_chat";

const CHAT_TOOL_DESCRIPTION: &str = "\
Ask TxGemma Chat model a question about drug discovery, molecular properties, \
or therapeutic development. The chat model provides detailed explanations and can discuss \
drug-target interactions, toxicity mechanisms, pharmacokinetics, and more.

Use this tool when you need:
- Explanations of molecular properties
- Discussion of drug mechanisms
- Advice on drug discovery strategies
- Interpretation of SMILES structures
- Understanding of biological targets

Examples:
- \"Why might the drug CC(=O)OC1=CC=CC=C1C(=O)O cause liver toxicity?\"
- \"What makes a good blood-brain barrier penetrant drug?\"
- \"How does protein sequence affect drug binding?\"";

const CHAT_QUESTION_DESCRIPTION: &str =
    "Your question about drug discovery, molecular properties, or therapeutic development";

/// Text generation backend (a predict or chat model).
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for `prompt`, excluding the prompt itself.
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for tool '{tool}': {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: PromptError,
    },

    #[error("Missing required parameter 'question'")]
    MissingQuestion,

    #[error("Model generation failed: {0}")]
    Generation(String),

    #[error("Chat model error: {0}")]
    Chat(String),

    #[error(transparent)]
    Repository(#[from] PromptError),
}

/// Routes tool calls to the predict model, or to the chat model for
/// [`CHAT_TOOL_NAME`] when chat is enabled.
pub struct ToolDispatcher {
    catalog: ToolCatalog,
    predictor: Arc<dyn Generator>,
    chat: Option<Arc<dyn Generator>>,
}

impl ToolDispatcher {
    pub fn new(repository: Arc<PromptRepository>, predictor: Arc<dyn Generator>) -> Self {
        Self {
            catalog: ToolCatalog::new(repository),
            predictor,
            chat: None,
        }
    }

    /// Enable the chat tool, backed by `generator`.
    pub fn with_chat(mut self, generator: Arc<dyn Generator>) -> Self {
        self.chat = Some(generator);
        self
    }

    pub fn chat_enabled(&self) -> bool {
        self.chat.is_some()
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Catalog tools for `filter`, followed by the chat tool when enabled.
    pub fn tools(&self, filter: &ToolFilter) -> Result<Vec<Tool>, PromptError> {
        let mut tools = self.catalog.build_tools(filter)?;
        if self.chat_enabled() {
            tools.push(chat_tool());
        }
        Ok(tools)
    }

    /// Render the prompt a call to `name` would send to the model.
    pub fn render_prompt(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<String, DispatchError> {
        let template = self
            .catalog
            .repository()
            .get(name)
            .map_err(|e| match e {
                PromptError::TemplateNotFound { .. } => DispatchError::UnknownTool(name.to_string()),
                other => DispatchError::Repository(other),
            })?;

        template
            .format(arguments)
            .map_err(|source| DispatchError::InvalidArguments {
                tool: name.to_string(),
                source,
            })
    }

    /// Execute a tool call. Never fails; errors become error results.
    pub async fn call_tool(&self, name: &str, arguments: &Map<String, Value>) -> CallToolResult {
        let outcome = match &self.chat {
            Some(chat) if name == CHAT_TOOL_NAME => self.ask(chat.as_ref(), arguments).await,
            _ => self.predict(name, arguments).await,
        };

        match outcome {
            Ok(text) => CallToolResult::text(text.trim()),
            Err(e) => {
                error!(tool = %name, error = %e, "Tool execution failed");
                CallToolResult::error(e)
            }
        }
    }

    async fn predict(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<String, DispatchError> {
        let prompt = self.render_prompt(name, arguments)?;

        info!(tool = %name, "Executing tool");
        debug!(tool = %name, prompt = %prompt, "Rendered prompt");

        let output = self
            .predictor
            .generate(&prompt)
            .await
            .map_err(|e| DispatchError::Generation(format!("{:#}", e)))?;

        info!(tool = %name, "Generated result");
        Ok(output)
    }

    async fn ask(
        &self,
        generator: &dyn Generator,
        arguments: &Map<String, Value>,
    ) -> Result<String, DispatchError> {
        let question = match arguments.get("question") {
            Some(Value::String(q)) if !q.is_empty() => q,
            _ => return Err(DispatchError::MissingQuestion),
        };

        info!(chars = question.len(), "Executing chat");
        let answer = generator
            .generate(question)
            .await
            .map_err(|e| DispatchError::Chat(format!("{:#}", e)))?;

        info!("Chat response generated");
        Ok(answer)
    }
}

impl std::fmt::Debug for ToolDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatcher")
            .field("catalog", &self.catalog)
            .field("chat_enabled", &self.chat_enabled())
            .finish()
    }
}

/// Descriptor of the conversational tool.
pub fn chat_tool() -> Tool {
    let mut properties = Map::new();
    properties.insert(
        "question".to_string(),
        json!({
            "type": "string",
            "description": CHAT_QUESTION_DESCRIPTION,
        }),
    );

    Tool::new(CHAT_TOOL_NAME, CHAT_TOOL_DESCRIPTION)
        .with_input_schema(ToolSchema::closed(properties, vec!["question".to_string()]))
}

/// Tool description with a "Parameters:" block appended for agents that only
/// read descriptions.
pub fn agent_description(tool: &Tool) -> String {
    let schema = &tool.input_schema;
    let mut description = tool.description.clone();
    if schema.properties.is_empty() {
        return description;
    }

    description.push_str("\n\nParameters:");
    for (name, info) in &schema.properties {
        let param_description = info.get("description").and_then(Value::as_str).unwrap_or("");
        let param_type = info.get("type").and_then(Value::as_str).unwrap_or("string");
        let marker = if schema.is_required(name) {
            "required"
        } else {
            "optional"
        };
        description.push_str(&format!(
            "\n- {} ({}): {} (type: {})",
            name, marker, param_description, param_type
        ));
    }
    description
}
