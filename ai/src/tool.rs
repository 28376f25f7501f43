use std::collections::HashMap;
use std::fmt::Display;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::{Tool, create_tool};

/// A function the model may call. Results are status dictionaries built with
/// [`tool_success`] or [`tool_failure`]; errors are never raised past this boundary.
#[async_trait]
pub trait AgentTool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object
    fn parameters(&self) -> Value;

    async fn call(&self, args: Value) -> Value;

    fn definition(&self) -> Tool {
        create_tool(
            self.name(),
            self.description(),
            object_schema(self.parameters()),
        )
    }
}

/// Turns a JSON object into the parameter map the model expects. Anything else yields an empty map.
pub fn object_schema(value: Value) -> HashMap<String, Value> {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        _ => HashMap::new(),
    }
}

/// `{"status": "success", ..fields}`. A non-object payload is stored under `result`.
pub fn tool_success(payload: Value) -> Value {
    let mut response = Map::new();
    response.insert("status".to_string(), json!("success"));

    match payload {
        Value::Object(fields) => response.extend(fields),
        other => {
            response.insert("result".to_string(), other);
        }
    }

    Value::Object(response)
}

/// `{"status": "error", "error_message": ..}`
pub fn tool_failure(err: impl Display) -> Value {
    json!({
        "status": "error",
        "error_message": err.to_string(),
    })
}
