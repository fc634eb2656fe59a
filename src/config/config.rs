//! Ledgerchat configuration management
//! Handles loading and saving the config file

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Ledgerchat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API key for the hosted model endpoint. Falls back to the
    /// GROQ_API_KEY environment variable when empty.
    #[serde(default)]
    pub api_key: String,

    /// Base URL of the OpenAI-compatible hosted endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model ids for each capability
    #[serde(default)]
    pub models: ModelConfig,

    /// Database path
    #[serde(default = "default_db_path")]
    pub database_path: String,

    /// Webhook server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Cache TTLs, in seconds
    #[serde(default)]
    pub cache: CacheConfig,

    /// Bounded retry count for hosted-model calls
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_db_path() -> String {
    "~/.ledgerchat/ledgerchat.db".to_string()
}

fn default_retries() -> u32 {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            models: ModelConfig::default(),
            database_path: default_db_path(),
            server: ServerConfig::default(),
            cache: CacheConfig::default(),
            retries: default_retries(),
        }
    }
}

/// Hosted-model ids per capability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_chat_model")]
    pub chat: String,
    #[serde(default = "default_transcription_model")]
    pub transcription: String,
    #[serde(default = "default_vision_model")]
    pub vision: String,
}

fn default_chat_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_transcription_model() -> String {
    "whisper-large-v3-turbo".to_string()
}

fn default_vision_model() -> String {
    "meta-llama/llama-4-scout-17b-16e-instruct".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            chat: default_chat_model(),
            transcription: default_transcription_model(),
            vision: default_vision_model(),
        }
    }
}

/// Webhook server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Cache TTLs, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Ledger data reads
    #[serde(default = "default_data_ttl")]
    pub data_secs: u64,
    /// Aggregate statistics
    #[serde(default = "default_stats_ttl")]
    pub stats_secs: u64,
    /// Memoized hosted-model responses
    #[serde(default = "default_model_ttl")]
    pub model_secs: u64,
}

fn default_data_ttl() -> u64 {
    300
}

fn default_stats_ttl() -> u64 {
    600
}

fn default_model_ttl() -> u64 {
    3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            data_secs: default_data_ttl(),
            stats_secs: default_stats_ttl(),
            model_secs: default_model_ttl(),
        }
    }
}

impl Config {
    /// Load config from the default location or specified path
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = Self::config_path(path)?;

        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Config::default();
            config.save(path)?;
            return Ok(config);
        }

        let raw = fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config = serde_yaml::from_str(&raw).context("Failed to parse config file")?;

        debug!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self, path: Option<&str>) -> Result<()> {
        let config_path = Self::config_path(path)?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(&self)?;
        fs::write(&config_path, content).context("Failed to write config file")?;

        info!("Saved config to {:?}", config_path);
        Ok(())
    }

    /// Get the config file path
    fn config_path(path: Option<&str>) -> Result<PathBuf> {
        // Check env override first
        if let Ok(env_path) = std::env::var("LEDGERCHAT_CONFIG") {
            return Ok(PathBuf::from(env_path));
        }

        if let Some(p) = path {
            return Ok(PathBuf::from(p));
        }

        let home = dirs::home_dir().context("Cannot find home directory")?;
        Ok(home.join(".ledgerchat").join("config.yml"))
    }

    /// API key, preferring the config file over the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        if !self.api_key.is_empty() {
            return Some(self.api_key.clone());
        }
        std::env::var("GROQ_API_KEY").ok().filter(|k| !k.is_empty())
    }

    /// Resolve database path (expand ~)
    pub fn resolve_db_path(&self) -> Result<PathBuf> {
        let home = dirs::home_dir().context("Cannot find home directory")?;
        let path = self.database_path.replace('~', &home.to_string_lossy());
        Ok(PathBuf::from(path))
    }
}
