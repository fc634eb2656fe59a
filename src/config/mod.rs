//! Ledgerchat configuration module

pub mod config;

pub use config::{CacheConfig, Config, ModelConfig, ServerConfig};
