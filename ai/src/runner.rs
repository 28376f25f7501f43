use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::rc::Rc;
use std::sync::Arc;

use futures::future::LocalBoxFuture;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::{Agent, AiError, ChatBackend, Message, ToolCallInfo, tool_failure, tool_success};

/// Creates the conversation backing an agent.
pub type BackendFactory = dyn Fn(&Agent) -> Result<Box<dyn ChatBackend>, AiError>;

/// What happened while an agent worked on a prompt
#[derive(Debug, Clone)]
pub enum RunEvent {
    Text {
        agent: String,
        text: String,
    },
    ToolCall {
        agent: String,
        call: ToolCallInfo,
    },
    ToolResult {
        agent: String,
        tool: String,
        result: Value,
    },
}

/// Drives one agent: sends prompts, runs the tools the model asks for and feeds
/// the results back until the model answers. Sub-agents get their own runner,
/// created on first use and kept for the rest of the conversation.
pub struct Runner {
    agent: Arc<Agent>,
    backend: Box<dyn ChatBackend>,
    factory: Rc<BackendFactory>,
    delegates: HashMap<String, Runner>,
    max_tool_rounds: usize,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("agent", &self.agent.name)
            .field("delegates", &self.delegates.keys().collect::<Vec<_>>())
            .field("max_tool_rounds", &self.max_tool_rounds)
            .finish_non_exhaustive()
    }
}

impl Runner {
    pub fn new(
        agent: Arc<Agent>,
        factory: Rc<BackendFactory>,
        max_tool_rounds: usize,
    ) -> Result<Self, AiError> {
        let mut backend = factory(&agent)?;
        backend.set_system_prompt(agent.system_prompt());
        backend.set_tools(agent.tool_definitions());

        debug!(agent = %agent.name, model = %agent.model, "runner ready");

        Ok(Self {
            agent,
            backend,
            factory,
            delegates: HashMap::new(),
            max_tool_rounds,
        })
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Returns the model's final text, i.e. the text of the first completion that
    /// requested no tools.
    pub fn ask<'a>(
        &'a mut self,
        prompt: &'a str,
        on_event: &'a mut dyn FnMut(RunEvent),
    ) -> LocalBoxFuture<'a, Result<String, AiError>> {
        Box::pin(async move {
            let agent = self.agent.name.clone();
            let mut input = vec![Message::User(prompt.to_string())];
            let mut rounds = 0;

            loop {
                let mut reply = String::new();
                let calls = self
                    .backend
                    .send(input, &mut |text: &str| {
                        reply.push_str(text);
                        on_event(RunEvent::Text {
                            agent: agent.clone(),
                            text: text.to_string(),
                        });
                    })
                    .await?;

                if calls.is_empty() {
                    return Ok(reply);
                }

                if rounds == self.max_tool_rounds {
                    warn!(%agent, limit = self.max_tool_rounds, "tool round limit reached");
                    return Err(AiError::ToolRoundLimit {
                        agent,
                        limit: self.max_tool_rounds,
                    });
                }
                rounds += 1;

                input = Vec::with_capacity(calls.len());
                for call in calls {
                    on_event(RunEvent::ToolCall {
                        agent: agent.clone(),
                        call: call.clone(),
                    });

                    let result = self.dispatch(&call, on_event).await;

                    on_event(RunEvent::ToolResult {
                        agent: agent.clone(),
                        tool: call.name.clone(),
                        result: result.clone(),
                    });
                    input.push(Message::ToolResult {
                        tool_call_id: call.id,
                        content: result.to_string(),
                    });
                }
            }
        })
    }

    async fn dispatch(&mut self, call: &ToolCallInfo, on_event: &mut dyn FnMut(RunEvent)) -> Value {
        let args: Value = if call.arguments.trim().is_empty() {
            json!({})
        } else {
            match serde_json::from_str(&call.arguments) {
                Ok(args) => args,
                Err(err) => {
                    return tool_failure(format!("invalid arguments for {}: {err}", call.name));
                }
            }
        };

        if let Some(tool) = self.agent.tool(&call.name).cloned() {
            info!(agent = %self.agent.name, tool = %call.name, "calling tool");
            return tool.call(args).await;
        }

        let Some(sub_agent) = self.agent.sub_agent(&call.name).cloned() else {
            warn!(agent = %self.agent.name, tool = %call.name, "model called an unknown tool");
            return tool_failure(format!("unknown tool: {}", call.name));
        };

        let Some(request) = args.get("request").and_then(Value::as_str) else {
            warn!(agent = %self.agent.name, to = %call.name, "delegation without a request");
            return tool_failure("missing required argument: request");
        };
        let request = request.to_string();

        let delegate = match self.delegates.entry(sub_agent.name.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                match Runner::new(sub_agent, Rc::clone(&self.factory), self.max_tool_rounds) {
                    Ok(runner) => entry.insert(runner),
                    Err(err) => return tool_failure(err),
                }
            }
        };

        info!(from = %self.agent.name, to = %call.name, "delegating request");
        match delegate.ask(&request, on_event).await {
            Ok(response) => tool_success(json!({
                "agent": call.name,
                "response": response,
            })),
            Err(err) => tool_failure(err),
        }
    }
}
