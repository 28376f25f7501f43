use std::fmt;
use std::sync::Arc;

use serde_json::json;

use crate::{AgentTool, Tool, create_tool, object_schema};

/// Declarative description of an agent: who it is, which model drives it,
/// which tools it may call and which agents it may hand work to.
pub struct Agent {
    pub name: String,
    pub model: String,
    pub description: String,
    pub instruction: String,
    pub tools: Vec<Arc<dyn AgentTool>>,
    pub sub_agents: Vec<Arc<Agent>>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("model", &self.model)
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field(
                "sub_agents",
                &self.sub_agents.iter().map(|a| &a.name).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl Agent {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            description: String::new(),
            instruction: String::new(),
            tools: vec![],
            sub_agents: vec![],
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    #[must_use]
    pub fn with_tool(mut self, tool: Arc<dyn AgentTool>) -> Self {
        self.tools.push(tool);
        self
    }

    #[must_use]
    pub fn with_sub_agent(mut self, agent: Agent) -> Self {
        self.sub_agents.push(Arc::new(agent));
        self
    }

    pub fn sub_agent(&self, name: &str) -> Option<&Arc<Agent>> {
        self.sub_agents.iter().find(|agent| agent.name == name)
    }

    pub fn tool(&self, name: &str) -> Option<&Arc<dyn AgentTool>> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    pub fn system_prompt(&self) -> String {
        let mut prompt = format!("You are {}. {}", self.name, self.description);

        if !self.instruction.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&self.instruction);
        }

        if !self.sub_agents.is_empty() {
            prompt.push_str(
                "\n\nYou can hand work to the following agents by calling the tool with \
                 the agent's name and a `request` describing what you need:",
            );
            for agent in &self.sub_agents {
                prompt.push_str(&format!("\n- {}: {}", agent.name, agent.description));
            }
        }

        prompt
    }

    /// Own tools followed by one delegation tool per sub-agent
    pub fn tool_definitions(&self) -> Vec<Tool> {
        self.tools
            .iter()
            .map(|tool| tool.definition())
            .chain(self.sub_agents.iter().map(|agent| delegation_tool(agent)))
            .collect()
    }

    /// Every distinct model id used by this agent and its sub-agents
    pub fn model_ids(&self) -> Vec<String> {
        let mut ids = vec![];
        self.collect_model_ids(&mut ids);
        ids
    }

    fn collect_model_ids(&self, ids: &mut Vec<String>) {
        if !ids.contains(&self.model) {
            ids.push(self.model.clone());
        }
        for agent in &self.sub_agents {
            agent.collect_model_ids(ids);
        }
    }
}

fn delegation_tool(agent: &Agent) -> Tool {
    create_tool(
        agent.name.clone(),
        format!("Hand a request to {}. {}", agent.name, agent.description),
        object_schema(json!({
            "type": "object",
            "properties": {
                "request": {
                    "type": "string",
                    "description": "What the agent should do, in plain language.",
                },
            },
            "required": ["request"],
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;

    struct Noop(&'static str);

    #[async_trait]
    impl AgentTool for Noop {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "does nothing"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        async fn call(&self, _args: Value) -> Value {
            Value::Null
        }
    }

    fn coordinator() -> Agent {
        Agent::new("coordinator", "model-a")
            .with_description("Routes requests.")
            .with_instruction("Ask the right agent.")
            .with_sub_agent(
                Agent::new("schema_agent", "model-a")
                    .with_description("Knows the tables.")
                    .with_tool(Arc::new(Noop("get_database_schema"))),
            )
            .with_sub_agent(
                Agent::new("operation_agent", "model-b")
                    .with_description("Runs SQL.")
                    .with_tool(Arc::new(Noop("interact_with_sql_database"))),
            )
    }

    #[test]
    fn system_prompt_names_sub_agents() {
        let prompt = coordinator().system_prompt();

        assert!(prompt.starts_with("You are coordinator. Routes requests."));
        assert!(prompt.contains("Ask the right agent."));
        assert!(prompt.contains("- schema_agent: Knows the tables."));
        assert!(prompt.contains("- operation_agent: Runs SQL."));
    }

    #[test]
    fn leaf_prompt_has_no_roster() {
        let agent = Agent::new("database_agent", "model-a").with_description("Talks SQL.");

        assert_eq!(agent.system_prompt(), "You are database_agent. Talks SQL.");
    }

    #[test]
    fn delegation_tools_follow_own_tools() {
        let agent = coordinator().with_tool(Arc::new(Noop("clock")));

        let names: Vec<String> = agent
            .tool_definitions()
            .into_iter()
            .map(|tool| tool.function.name)
            .collect();

        assert_eq!(names, ["clock", "schema_agent", "operation_agent"]);
    }

    #[test]
    fn model_ids_are_distinct() {
        assert_eq!(coordinator().model_ids(), ["model-a", "model-b"]);
    }

    #[test]
    fn lookups_by_name() {
        let agent = coordinator();

        assert!(agent.sub_agent("schema_agent").is_some());
        assert!(agent.sub_agent("nobody").is_none());
        assert!(agent.sub_agents[0].tool("get_database_schema").is_some());
    }
}
