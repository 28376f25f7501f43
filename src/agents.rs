use std::sync::Arc;

use ai::Agent;
use db::Database;

use crate::tools::{QueryTool, SchemaTool};

pub const DATABASE_AGENT: &str = "database_agent";
pub const COORDINATOR: &str = "coordinator";
pub const SCHEMA_AGENT: &str = "schema_agent";
pub const OPERATION_AGENT: &str = "operation_agent";

/// One agent owning both database tools.
pub fn single_agent(db: Arc<dyn Database>, model: &str) -> Agent {
    Agent::new(DATABASE_AGENT, model)
        .with_description(
            "An intelligent agent designed to query and update SQL databases. \
             It understands natural language prompts and translates them into SQL operations. \
             Prioritizes clean, readable, and accurate responses to the user.",
        )
        .with_instruction(
            "You can ask me to retrieve, update, or analyze data from your database using \
             natural language. I'll convert your request into a valid SQL query and return or \
             modify the data accordingly. Look up the schema before writing queries against \
             tables you have not inspected yet.",
        )
        .with_tool(Arc::new(SchemaTool::new(db.clone())))
        .with_tool(Arc::new(QueryTool::new(db)))
}

/// A coordinator that hands schema questions to one agent and SQL work to another.
pub fn multi_agent(db: Arc<dyn Database>, model: &str) -> Agent {
    let schema_agent = Agent::new(SCHEMA_AGENT, model)
        .with_description("Knows the structure of the database: its tables and their columns.")
        .with_instruction(
            "Use the schema tool to answer questions about which tables exist and which \
             columns, types and keys they have. Do not guess; always read the schema.",
        )
        .with_tool(Arc::new(SchemaTool::new(db.clone())));

    let operation_agent = Agent::new(OPERATION_AGENT, model)
        .with_description("Writes and runs SQL statements that read or change the data.")
        .with_instruction(
            "Translate the request into a single valid SQLite statement, run it with the SQL \
             tool and report the outcome. If the statement fails, read the error message, \
             fix the statement and try again.",
        )
        .with_tool(Arc::new(QueryTool::new(db)));

    let instruction = format!(
        "Work out what the user needs. Ask {schema} whenever you need to know table or column \
         names, then ask {operation} to run the SQL that answers the request, including the \
         table and column names {schema} reported. Summarize the result for the user in plain \
         language.",
        schema = schema_agent.name,
        operation = operation_agent.name,
    );

    Agent::new(COORDINATOR, model)
        .with_description(
            "Coordinates database work between a schema expert and an SQL operator.",
        )
        .with_instruction(instruction)
        .with_sub_agent(schema_agent)
        .with_sub_agent(operation_agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{GET_DATABASE_SCHEMA, INTERACT_WITH_SQL_DATABASE};
    use db::{DatabaseOptions, SqliteDatabase};

    fn db() -> Arc<dyn Database> {
        Arc::new(SqliteDatabase::new(DatabaseOptions::new("patient_records.db")))
    }

    fn tool_names(agent: &Agent) -> Vec<String> {
        agent
            .tool_definitions()
            .into_iter()
            .map(|tool| tool.function.name)
            .collect()
    }

    #[test]
    fn single_agent_owns_both_tools() {
        let agent = single_agent(db(), "test-model");

        assert_eq!(agent.name, DATABASE_AGENT);
        assert_eq!(agent.model, "test-model");
        assert!(agent.sub_agents.is_empty());
        assert_eq!(
            tool_names(&agent),
            [GET_DATABASE_SCHEMA, INTERACT_WITH_SQL_DATABASE]
        );
    }

    #[test]
    fn multi_agent_splits_tools_between_sub_agents() {
        let agent = multi_agent(db(), "test-model");

        assert_eq!(agent.name, COORDINATOR);
        assert!(agent.tools.is_empty());
        assert_eq!(tool_names(&agent), [SCHEMA_AGENT, OPERATION_AGENT]);

        let schema = agent.sub_agent(SCHEMA_AGENT).unwrap();
        assert_eq!(tool_names(schema), [GET_DATABASE_SCHEMA]);

        let operation = agent.sub_agent(OPERATION_AGENT).unwrap();
        assert_eq!(tool_names(operation), [INTERACT_WITH_SQL_DATABASE]);

        assert_eq!(agent.model_ids(), ["test-model"]);
    }

    #[test]
    fn coordinator_refers_to_sub_agents_by_name() {
        let agent = multi_agent(db(), "test-model");

        assert!(agent.instruction.contains(&format!("Ask {SCHEMA_AGENT}")));
        assert!(agent.instruction.contains(&format!("ask {OPERATION_AGENT}")));
        assert!(
            agent
                .system_prompt()
                .contains(&format!("- {OPERATION_AGENT}: Writes and runs SQL"))
        );
    }
}
