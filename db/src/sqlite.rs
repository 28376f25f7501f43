use crate::{ColumnInfo, Database, DatabaseOptions, DbError, QueryOutput, Schema, TableSchema};

use serde_json::{Value, json};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::tokenizer::{Token, Tokenizer};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, ConnectOptions, Connection, Executor, Row, Statement, TypeInfo, ValueRef};
use tracing::{debug, info, warn};

/// SQLite database that opens a fresh connection for every call and closes it before returning.
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    options: DatabaseOptions,
}

impl SqliteDatabase {
    #[must_use]
    pub fn new(options: DatabaseOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    async fn connect(&self, read_only: bool) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.options.path.display(), read_only, "opening sqlite connection");

        SqliteConnectOptions::new()
            .filename(&self.options.path)
            .create_if_missing(!read_only)
            .read_only(read_only)
            .connect()
            .await
            .map_err(|source| DbError::Connect {
                path: self.options.path.clone(),
                source,
            })
    }
}

async fn close(connection: SqliteConnection) {
    if let Err(err) = connection.close().await {
        warn!(%err, "failed to close sqlite connection");
    }
}

#[async_trait::async_trait]
impl Database for SqliteDatabase {
    async fn get_schema(&self) -> Result<Schema, DbError> {
        let mut connection = self.connect(true).await?;
        let schema = read_schema(&mut connection).await;
        close(connection).await;

        if let Err(err) = &schema {
            warn!(%err, "schema introspection failed");
        }
        schema
    }

    async fn execute(&self, query: &str) -> Result<QueryOutput, DbError> {
        info!(
            target: "audit",
            path = %self.options.path.display(),
            allow_writes = self.options.allow_writes,
            query,
            "executing statement"
        );

        if statement_count(query) > 1 {
            warn!("rejected text holding more than one statement");
            return Err(DbError::MultipleStatements);
        }

        let mut connection = self.connect(!self.options.allow_writes).await?;
        let output = run_statement(&mut connection, query).await;
        close(connection).await;

        match &output {
            Ok(output) => debug!(rows = output.rows.len(), "statement finished"),
            Err(err) => warn!(%err, "statement failed"),
        }
        output
    }
}

async fn read_schema(connection: &mut SqliteConnection) -> Result<Schema, DbError> {
    let table_names: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND substr(name, 1, 7) <> 'sqlite_'",
    )
    .fetch_all(&mut *connection)
    .await?;

    let mut tables = Vec::with_capacity(table_names.len());

    for name in table_names {
        // The table name is bound, never spliced into the statement text.
        let rows = sqlx::query(
            r#"SELECT cid, name, "type", "notnull", dflt_value, pk
               FROM pragma_table_info(?1)
               ORDER BY cid"#,
        )
        .bind(&name)
        .fetch_all(&mut *connection)
        .await?;

        let columns = rows
            .iter()
            .map(column_info)
            .collect::<Result<Vec<_>, _>>()?;

        tables.push(TableSchema { name, columns });
    }

    Ok(Schema { tables })
}

fn column_info(row: &SqliteRow) -> Result<ColumnInfo, sqlx::Error> {
    Ok(ColumnInfo {
        cid: row.try_get("cid")?,
        name: row.try_get("name")?,
        data_type: row.try_get("type")?,
        notnull: row.try_get::<i64, _>("notnull")? != 0,
        dflt_value: row.try_get("dflt_value")?,
        pk: row.try_get("pk")?,
    })
}

async fn run_statement(
    connection: &mut SqliteConnection,
    query: &str,
) -> Result<QueryOutput, DbError> {
    // Column names come from the prepared statement so empty result sets keep them.
    let statement = (&mut *connection).prepare(query).await?;
    let columns = statement
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();

    let rows = statement.query().fetch_all(&mut *connection).await?;

    let rows = rows
        .iter()
        .map(|row| {
            (0..row.len())
                .map(|i| column_value(row, i))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(QueryOutput { columns, rows })
}

/// Converts a cell by its runtime storage class, not the declared column type.
fn column_value(row: &SqliteRow, i: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(i)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let value = match raw.type_info().name() {
        "INTEGER" => json!(row.try_get::<i64, _>(i)?),
        "REAL" => json!(row.try_get::<f64, _>(i)?),
        "BLOB" => json!(row.try_get::<Vec<u8>, _>(i)?),
        _ => json!(row.try_get::<String, _>(i)?),
    };

    Ok(value)
}

/// Counts the statements in `query`. Whitespace, comments and empty statements between
/// semicolons do not count, and semicolons inside a trigger's `BEGIN ... END` body do not
/// end the statement.
fn statement_count(query: &str) -> usize {
    let tokens = match Tokenizer::new(&SQLiteDialect {}, query).tokenize() {
        Ok(tokens) => tokens,
        Err(err) => {
            // Unterminated literals and the like are left for sqlite to report.
            debug!(%err, "could not tokenize statement");
            return 1;
        }
    };

    let mut count = 0;
    let mut in_statement = false;
    let mut is_trigger = false;
    let mut body_depth = 0usize;

    for token in &tokens {
        match token {
            Token::SemiColon if body_depth == 0 => {
                in_statement = false;
                is_trigger = false;
            }
            Token::Whitespace(_) | Token::EOF | Token::SemiColon => {}
            token => {
                if !in_statement {
                    in_statement = true;
                    count += 1;
                }

                if is_keyword(token, "TRIGGER") {
                    is_trigger = true;
                } else if is_trigger && (is_keyword(token, "BEGIN") || is_keyword(token, "CASE")) {
                    body_depth += 1;
                } else if is_keyword(token, "END") {
                    body_depth = body_depth.saturating_sub(1);
                }
            }
        }
    }

    count
}

fn is_keyword(token: &Token, keyword: &str) -> bool {
    matches!(
        token,
        Token::Word(word) if word.quote_style.is_none() && word.value.eq_ignore_ascii_case(keyword)
    )
}
