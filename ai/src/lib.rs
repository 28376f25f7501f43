pub mod agent;
pub mod runner;
pub mod tool;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use mistralrs::{Model, RequestBuilder, Response, TextMessageRole, TextModelBuilder, ToolChoice};
use thiserror::Error;
use tracing::{debug, info};

pub use agent::Agent;
pub use runner::{BackendFactory, RunEvent, Runner};
pub use tool::{AgentTool, object_schema, tool_failure, tool_success};

// Re-export types that consumers will need to create and use tools
pub use mistralrs::{Function, Tool, ToolType};
pub use serde_json::{Value, json};
pub use std::collections::HashMap;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("model error: {0}")]
    Model(String),

    #[error("no model loaded for id {0}")]
    UnknownModel(String),

    #[error("agent {agent} used {limit} tool rounds without answering")]
    ToolRoundLimit { agent: String, limit: usize },
}

/// Information about a tool call from the model
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolCallInfo {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// Represents a chunk in the streaming response
#[derive(Debug, Clone)]
pub enum StreamChunk {
    /// Regular text content
    Text(String),
    /// A tool call request from the model
    ToolCall(ToolCallInfo),
}

/// Input for the next completion
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    User(String),
    ToolResult {
        tool_call_id: String,
        content: String,
    },
}

/// A conversation with a model that can request tool calls.
#[async_trait(?Send)]
pub trait ChatBackend {
    /// Replaces the system prompt, keeping the rest of the history.
    fn set_system_prompt(&mut self, prompt: String);

    /// Set all tools, replacing any existing tools
    fn set_tools(&mut self, tools: Vec<Tool>);

    /// Appends `input` to the history and streams the next completion.
    /// Returns the tool calls the model asked for, empty when it answered directly.
    async fn send(
        &mut self,
        input: Vec<Message>,
        on_text: &mut dyn for<'t> FnMut(&'t str),
    ) -> Result<Vec<ToolCallInfo>, AiError>;
}

pub struct LLM {
    model: Arc<Model>,
    history: Vec<(TextMessageRole, String)>,
    tools: Vec<Tool>,
}

impl LLM {
    pub async fn load(model_id: &str) -> Result<Self, AiError> {
        info!(model_id, "loading model");
        let model = TextModelBuilder::new(model_id)
            .with_dtype(mistralrs::ModelDType::Auto)
            .build()
            .await
            .map_err(|e| AiError::Model(e.to_string()))?;

        Ok(LLM {
            model: Arc::new(model),
            history: vec![],
            tools: vec![],
        })
    }

    /// A fresh conversation on the same loaded weights
    pub fn session(&self) -> Self {
        LLM {
            model: Arc::clone(&self.model),
            history: vec![],
            tools: vec![],
        }
    }

    fn push_tool_result(&mut self, tool_call_id: String, result: String) {
        self.history.push((
            TextMessageRole::Tool,
            serde_json::json!({
                "tool_call_id": tool_call_id,
                "content": result,
            })
            .to_string(),
        ));
    }

    async fn complete<F, Fut>(&mut self, mut on_chunk: F) -> Result<Vec<ToolCallInfo>, String>
    where
        F: FnMut(StreamChunk) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut request_builder = self
            .history
            .iter()
            .fold(RequestBuilder::new(), |builder, (role, content)| {
                builder.add_message(role.clone(), content.clone())
            });

        if !self.tools.is_empty() {
            request_builder = request_builder
                .set_tools(self.tools.clone())
                .set_tool_choice(ToolChoice::Auto);
        }

        let mut stream = self
            .model
            .stream_chat_request(request_builder)
            .await
            .map_err(|e| e.to_string())?;

        let mut full_response = String::new();
        let mut tool_calls: Vec<ToolCallInfo> = vec![];

        while let Some(chunk) = stream.next().await {
            if let Response::Chunk(chunk_response) = chunk {
                if let Some(choice) = chunk_response.choices.first()
                    && let Some(content) = &choice.delta.content
                {
                    full_response.push_str(content);
                    on_chunk(StreamChunk::Text(content.clone())).await;
                }
                if let Some(choice) = chunk_response.choices.first()
                    && let Some(calls) = &choice.delta.tool_calls
                {
                    for call in calls {
                        let tool_call_info = ToolCallInfo {
                            id: call.id.clone(),
                            name: call.function.name.clone(),
                            arguments: call.function.arguments.clone(),
                        };
                        tool_calls.push(tool_call_info.clone());
                        on_chunk(StreamChunk::ToolCall(tool_call_info)).await;
                    }
                }
            }
        }

        debug!(
            chars = full_response.len(),
            tool_calls = tool_calls.len(),
            "completion finished"
        );

        self.history
            .push((TextMessageRole::Assistant, full_response));

        Ok(tool_calls)
    }
}

#[async_trait(?Send)]
impl ChatBackend for LLM {
    fn set_system_prompt(&mut self, prompt: String) {
        self.history
            .retain(|(role, _)| !matches!(role, TextMessageRole::System));
        self.history.insert(0, (TextMessageRole::System, prompt));
    }

    fn set_tools(&mut self, tools: Vec<Tool>) {
        self.tools = tools;
    }

    async fn send(
        &mut self,
        input: Vec<Message>,
        on_text: &mut dyn for<'t> FnMut(&'t str),
    ) -> Result<Vec<ToolCallInfo>, AiError> {
        for message in input {
            match message {
                Message::User(prompt) => self.history.push((TextMessageRole::User, prompt)),
                Message::ToolResult {
                    tool_call_id,
                    content,
                } => self.push_tool_result(tool_call_id, content),
            }
        }

        self.complete(|chunk| {
            if let StreamChunk::Text(text) = &chunk {
                on_text(text);
            }
            std::future::ready(())
        })
        .await
        .map_err(AiError::Model)
    }
}

/// Helper function to create a tool with the given name, description, and parameters
///
/// # Example
/// ```rust
/// use ai::{create_tool, json, object_schema};
///
/// let parameters = object_schema(json!({
///     "type": "object",
///     "properties": {
///         "query": {
///             "type": "string",
///             "description": "The SQL query to execute",
///         },
///     },
///     "required": ["query"],
/// }));
///
/// let tool = create_tool(
///     "interact_with_sql_database",
///     "Execute a SQL query against the database",
///     parameters,
/// );
/// assert_eq!(tool.function.name, "interact_with_sql_database");
/// ```
pub fn create_tool(
    name: impl Into<String>,
    description: impl Into<String>,
    parameters: HashMap<String, Value>,
) -> Tool {
    Tool {
        tp: ToolType::Function,
        function: Function {
            name: name.into(),
            description: Some(description.into()),
            parameters: Some(parameters),
        },
    }
}
