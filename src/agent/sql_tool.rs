//! SQL execution tool
//!
//! The single tool offered to the hosted model. Executes exactly one
//! statement per invocation; writes bump the ledger generation so every
//! cached aggregate downstream is invalidated.

use anyhow::{Context, Result};
use rusqlite::types::ValueRef;
use serde_json::{json, Value};
use tracing::debug;

use crate::db::Database;

pub struct SqlTool {
    db: Database,
}

/// Result of one statement: a tabular read, or a write with its row count.
#[derive(Debug)]
pub enum SqlOutcome {
    Rows(Vec<Value>),
    Changed(usize),
}

impl SqlOutcome {
    /// Compact text form fed back to the model as the tool result.
    pub fn render(&self) -> String {
        match self {
            SqlOutcome::Rows(rows) if rows.is_empty() => "(no rows)".to_string(),
            SqlOutcome::Rows(rows) => {
                serde_json::to_string(rows).unwrap_or_else(|_| "(unrenderable rows)".to_string())
            }
            SqlOutcome::Changed(n) => format!("OK, {} row(s) affected", n),
        }
    }
}

impl SqlTool {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Execute a single SQL statement against the ledger.
    pub async fn execute(&self, sql: &str) -> Result<SqlOutcome> {
        let statement = sql.trim().trim_end_matches(';').trim();
        if statement.is_empty() {
            anyhow::bail!("Empty SQL statement");
        }
        // One statement per turn; a second statement smuggled after a
        // semicolon is rejected, not silently dropped.
        if statement.contains(';') {
            anyhow::bail!("Only one SQL statement is allowed per turn");
        }

        debug!("Executing SQL: {}", statement);

        let first_word = statement
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();

        let conn = self.db.lock().await;

        if first_word == "SELECT" || first_word == "WITH" {
            let mut stmt = conn
                .prepare(statement)
                .context("Failed to prepare SQL statement")?;
            let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

            let rows = stmt.query_map([], |row| {
                let mut object = serde_json::Map::new();
                for (i, name) in columns.iter().enumerate() {
                    object.insert(name.clone(), json_value(row.get_ref(i)?));
                }
                Ok(Value::Object(object))
            })?;

            let collected: Vec<Value> = rows
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to read query results")?;

            Ok(SqlOutcome::Rows(collected))
        } else {
            let changed = conn
                .execute(statement, [])
                .context("Failed to execute SQL statement")?;
            drop(conn);
            self.db.bump_generation();

            Ok(SqlOutcome::Changed(changed))
        }
    }
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => json!(i),
        ValueRef::Real(f) => json!(f),
        ValueRef::Text(t) => json!(String::from_utf8_lossy(t)),
        ValueRef::Blob(b) => json!(format!("<{} bytes>", b.len())),
    }
}
