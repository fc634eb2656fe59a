//! Database connection management
//!
//! NOTE: This uses synchronous rusqlite behind a tokio::Mutex. Each user
//! turn touches the ledger at most a handful of times, so a single shared
//! connection is enough; the relational engine's own transaction isolation
//! covers concurrent sessions.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tokio::sync::Mutex;
use tracing::info;

use super::schema::SCHEMA;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: String,
    /// Bumped on every ledger write; cached reads are keyed by it so a
    /// stale aggregate can never be served after an insert/update/delete.
    generation: Arc<AtomicU64>,
}

impl Database {
    /// Open (or create) the database at `path` and initialize the schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Database initialized at {:?}", path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_string_lossy().to_string(),
            generation: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Get a locked connection.
    ///
    /// WARNING: holds the mutex for the duration of the operation, blocking
    /// other async tasks from touching the database.
    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }

    /// Get the database path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current write generation of the ledger.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Record a ledger write, invalidating generation-keyed caches.
    pub fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Check if database is accessible (for health checks)
    pub async fn health_check(&self) -> Result<bool> {
        let conn = self.lock().await;
        match conn.query_row("SELECT 1", [], |_| Ok(())) {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::warn!("Database health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            path: self.path.clone(),
            generation: Arc::clone(&self.generation),
        }
    }
}
