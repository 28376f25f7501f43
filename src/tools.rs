use std::sync::Arc;

use ai::{AgentTool, Value, json, tool_failure, tool_success};
use async_trait::async_trait;
use db::Database;

pub const GET_DATABASE_SCHEMA: &str = "get_database_schema";
pub const INTERACT_WITH_SQL_DATABASE: &str = "interact_with_sql_database";

/// Lists every table with its column metadata.
pub struct SchemaTool {
    db: Arc<dyn Database>,
}

impl SchemaTool {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AgentTool for SchemaTool {
    fn name(&self) -> &str {
        GET_DATABASE_SCHEMA
    }

    fn description(&self) -> &str {
        "Returns the schema of the SQLite database: every table with its columns \
         (cid, name, declared type, notnull flag, default value, primary key position). \
         Call this before writing SQL against tables you have not seen yet."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
        })
    }

    async fn call(&self, _args: Value) -> Value {
        let schema = match self.db.get_schema().await {
            Ok(schema) => schema,
            Err(err) => return tool_failure(err),
        };

        match serde_json::to_value(&schema.tables) {
            Ok(tables) => tool_success(json!({ "schema": tables })),
            Err(err) => tool_failure(err),
        }
    }
}

/// Runs one caller-supplied SQL statement and returns its rows.
pub struct QueryTool {
    db: Arc<dyn Database>,
}

impl QueryTool {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AgentTool for QueryTool {
    fn name(&self) -> &str {
        INTERACT_WITH_SQL_DATABASE
    }

    fn description(&self) -> &str {
        "Executes a single SQL statement on the SQLite database and returns the resulting rows. \
         Text holding several statements is rejected without running any of them. \
         Write statements are committed immediately."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The SQL query to execute against the database.",
                },
            },
            "required": ["query"],
        })
    }

    async fn call(&self, args: Value) -> Value {
        let Some(query) = args.get("query").and_then(Value::as_str) else {
            return tool_failure("missing required argument: query");
        };

        match self.db.execute(query).await {
            Ok(output) => tool_success(json!({
                "columns": output.columns,
                "result": output.rows,
            })),
            Err(err) => tool_failure(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::{DatabaseOptions, SqliteDatabase};
    use tempfile::TempDir;

    async fn clinic() -> (TempDir, Arc<dyn Database>) {
        let dir = tempfile::tempdir().unwrap();
        let db = SqliteDatabase::new(DatabaseOptions::new(dir.path().join("patient_records.db")));

        for statement in [
            "CREATE TABLE patients (id INTEGER PRIMARY KEY, name TEXT NOT NULL, age INTEGER)",
            "CREATE TABLE visits (id INTEGER PRIMARY KEY, patient_id INTEGER, reason TEXT)",
            "INSERT INTO patients (name, age) VALUES ('Ada', 36), ('Grace', 45)",
        ] {
            db.execute(statement).await.unwrap();
        }

        (dir, Arc::new(db))
    }

    #[tokio::test]
    async fn schema_tool_reports_tables_and_columns() {
        let (_dir, db) = clinic().await;

        let response = SchemaTool::new(db).call(json!({})).await;

        assert_eq!(response["status"], "success");
        let tables = response["schema"].as_array().unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0]["name"], "patients");
        assert_eq!(tables[0]["columns"].as_array().unwrap().len(), 3);
        assert_eq!(
            tables[0]["columns"][1],
            json!({
                "cid": 1,
                "name": "name",
                "type": "TEXT",
                "notnull": true,
                "dflt_value": null,
                "pk": 0,
            })
        );
    }

    #[tokio::test]
    async fn schema_tool_turns_errors_into_status() {
        let dir = tempfile::tempdir().unwrap();
        let db = SqliteDatabase::new(DatabaseOptions::new(dir.path().join("missing.db")));

        let response = SchemaTool::new(Arc::new(db)).call(json!({})).await;

        assert_eq!(response["status"], "error");
        assert!(!response["error_message"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn query_tool_returns_rows() {
        let (_dir, db) = clinic().await;

        let response = QueryTool::new(db)
            .call(json!({"query": "SELECT name FROM patients WHERE age > 40"}))
            .await;

        assert_eq!(
            response,
            json!({"status": "success", "columns": ["name"], "result": [["Grace"]]})
        );
    }

    #[tokio::test]
    async fn query_tool_commits_writes() {
        let (_dir, db) = clinic().await;
        let tool = QueryTool::new(db);

        let insert = tool
            .call(json!({"query": "INSERT INTO visits (patient_id, reason) VALUES (1, 'checkup')"}))
            .await;
        assert_eq!(insert, json!({"status": "success", "columns": [], "result": []}));

        let select = tool
            .call(json!({"query": "SELECT reason FROM visits WHERE patient_id = 1"}))
            .await;
        assert_eq!(select["result"], json!([["checkup"]]));
    }

    #[tokio::test]
    async fn query_tool_rejects_batches_without_side_effects() {
        let (_dir, db) = clinic().await;
        let tool = QueryTool::new(db);

        let batch = tool
            .call(json!({
                "query": "INSERT INTO visits (patient_id, reason) VALUES (1, 'checkup'); \
                          SELECT * FROM prescriptions"
            }))
            .await;
        assert_eq!(
            batch,
            json!({
                "status": "error",
                "error_message": "You can only execute one statement at a time."
            })
        );

        let visits = tool
            .call(json!({"query": "SELECT count(*) AS total FROM visits"}))
            .await;
        assert_eq!(visits["columns"], json!(["total"]));
        assert_eq!(visits["result"], json!([[0]]));
    }

    #[tokio::test]
    async fn query_tool_never_raises() {
        let (_dir, db) = clinic().await;
        let tool = QueryTool::new(db.clone());

        for args in [
            json!({"query": "SELEC name FROM patients"}),
            json!({"query": "SELECT * FROM prescriptions"}),
            json!({"sql": "SELECT 1"}),
        ] {
            let response = tool.call(args).await;
            assert_eq!(response["status"], "error");
            assert!(!response["error_message"].as_str().unwrap().is_empty());
        }

        let schema = SchemaTool::new(db).call(json!({})).await;
        assert_eq!(schema["schema"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn tool_definitions_match_their_names() {
        let db: Arc<dyn Database> = Arc::new(SqliteDatabase::new(DatabaseOptions::new(
            "unused.db",
        )));

        let schema = SchemaTool::new(db.clone()).definition();
        let query = QueryTool::new(db).definition();

        assert_eq!(schema.function.name, GET_DATABASE_SCHEMA);
        assert_eq!(query.function.name, INTERACT_WITH_SQL_DATABASE);
        let parameters = query.function.parameters.unwrap();
        assert_eq!(parameters["required"], json!(["query"]));
    }
}
