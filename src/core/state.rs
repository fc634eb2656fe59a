//! Application state

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::cache::{MemoCache, QueryCache};
use crate::config::Config;
use crate::db::{Database, MessageRepository, TransactionRepository};

pub struct AppState {
    pub db: Database,
    pub transactions: TransactionRepository,
    pub messages: MessageRepository,
    /// Aggregate reads, generation-tagged so writes invalidate them
    pub reports: QueryCache,
    /// Memoized hosted-model responses for media, keyed by content hash
    pub media_memo: Arc<MemoCache>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = config.resolve_db_path()?;
        let db = Database::new(db_path)?;

        Ok(Self {
            transactions: TransactionRepository::new(db.clone()),
            messages: MessageRepository::new(db.clone()),
            reports: QueryCache::new(Duration::from_secs(config.cache.stats_secs)),
            media_memo: Arc::new(MemoCache::new(Duration::from_secs(config.cache.model_secs))),
            db,
            config,
        })
    }

    /// Build state over an already-open database (tests, CLI overrides).
    pub fn with_database(config: Config, db: Database) -> Self {
        Self {
            transactions: TransactionRepository::new(db.clone()),
            messages: MessageRepository::new(db.clone()),
            reports: QueryCache::new(Duration::from_secs(config.cache.stats_secs)),
            media_memo: Arc::new(MemoCache::new(Duration::from_secs(config.cache.model_secs))),
            db,
            config,
        }
    }
}
