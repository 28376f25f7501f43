pub mod sqlite;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

pub use sqlite::SqliteDatabase;

/// Trait defining the interface for database operations
#[async_trait]
pub trait Database: Send + Sync {
    /// Get the database schema information
    /// Returns every user table in engine order, each with its columns in declaration order.
    ///
    /// # Errors
    /// Fails when the database cannot be opened or introspected.
    async fn get_schema(&self) -> Result<Schema, DbError>;

    /// Execute an sql statement, commit it and return whatever rows the statement produces.
    /// The text is run as-is apart from a check that it holds a single statement.
    ///
    /// # Errors
    /// Fails when the text holds more than one statement, when the database cannot be
    /// opened, or when the engine rejects the statement.
    async fn execute(&self, query: &str) -> Result<QueryOutput, DbError>;
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("could not open database {}: {source}", .path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("You can only execute one statement at a time.")]
    MultipleStatements,
}

/// Where the database lives and what the executor is allowed to do with it.
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub path: PathBuf,
    pub allow_writes: bool,
}

impl DatabaseOptions {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            allow_writes: true,
        }
    }

    #[must_use]
    pub fn allow_writes(mut self, allow_writes: bool) -> Self {
        self.allow_writes = allow_writes;
        self
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Schema {
    pub tables: Vec<TableSchema>,
}

impl Schema {
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|table| table.name == name)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

/// One row of `PRAGMA table_info`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ColumnInfo {
    pub cid: i64,
    pub name: String,
    /// Declared type, empty when the column was declared without one
    #[serde(rename = "type")]
    pub data_type: String,
    pub notnull: bool,
    pub dflt_value: Option<String>,
    /// 1-based position in the primary key, 0 when the column is not part of it
    pub pk: i64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct QueryOutput {
    /// Column names of the result set, empty for statements that produce no columns
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}
