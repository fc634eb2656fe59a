//! Conversation history repository

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Database;

/// One stored conversation turn. Roles follow the chat-completions
/// convention: "user", "assistant", "tool".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub session_id: String,
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

pub struct MessageRepository {
    db: Database,
}

impl MessageRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Append a turn to a session's history.
    pub async fn append(&self, session_id: &str, role: &str, content: &str) -> Result<StoredMessage> {
        let message = StoredMessage {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            role: role.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
        };

        let conn = self.db.lock().await;
        conn.execute(
            "INSERT INTO messages (id, session_id, role, content, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.id,
                message.session_id,
                message.role,
                message.content,
                message.timestamp.to_rfc3339(),
            ],
        )
        .context("Failed to insert message")?;

        Ok(message)
    }

    /// Full history for a session, oldest first.
    pub async fn history(&self, session_id: &str) -> Result<Vec<StoredMessage>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, session_id, role, content, timestamp
             FROM messages WHERE session_id = ?1 ORDER BY timestamp ASC, id ASC",
        )?;

        let rows = stmt.query_map(params![session_id], |row| {
            let timestamp = DateTime::parse_from_rfc3339(&row.get::<_, String>(4)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            Ok(StoredMessage {
                id: row.get(0)?,
                session_id: row.get(1)?,
                role: row.get(2)?,
                content: row.get(3)?,
                timestamp,
            })
        })?;

        let messages: Vec<StoredMessage> = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to collect messages")?;

        Ok(messages)
    }

    /// Drop a session's history.
    pub async fn clear(&self, session_id: &str) -> Result<()> {
        let conn = self.db.lock().await;
        conn.execute("DELETE FROM messages WHERE session_id = ?1", params![session_id])?;
        tracing::debug!("Cleared history for session: {}", session_id);
        Ok(())
    }
}
