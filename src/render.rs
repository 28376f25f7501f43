use ai::Value;
use comfy_table::{Table, presets::UTF8_FULL};

/// Plain-text rendering of a tool's status dictionary for the terminal.
pub fn tool_result(result: &Value) -> String {
    if result["status"] == "error" {
        return format!(
            "error: {}",
            result["error_message"].as_str().unwrap_or_default()
        );
    }

    if let Some(rows) = result.get("result").and_then(Value::as_array) {
        if rows.is_empty() {
            return "(no rows)".to_string();
        }
        let columns = result
            .get("columns")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        return rows_table(columns, rows).to_string();
    }

    if let Some(tables) = result.get("schema").and_then(Value::as_array) {
        return schema_summary(tables);
    }

    if let Some(agent) = result.get("agent").and_then(Value::as_str) {
        return format!("{agent} answered");
    }

    result.to_string()
}

pub fn rows_table(columns: &[Value], rows: &[Value]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);

    if !columns.is_empty() {
        table.set_header(columns.iter().map(cell).collect::<Vec<_>>());
    }

    for row in rows {
        match row.as_array() {
            Some(values) => table.add_row(values.iter().map(cell).collect::<Vec<_>>()),
            None => table.add_row(vec![cell(row)]),
        };
    }

    table
}

fn schema_summary(tables: &[Value]) -> String {
    tables
        .iter()
        .map(|table| {
            let columns = table["columns"]
                .as_array()
                .map(|columns| {
                    columns
                        .iter()
                        .map(|col| {
                            let name = col["name"].as_str().unwrap_or_default();
                            match col["type"].as_str() {
                                Some(ty) if !ty.is_empty() => format!("{name} {ty}"),
                                _ => name.to_string(),
                            }
                        })
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            format!("{}({columns})", table["name"].as_str().unwrap_or_default())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
